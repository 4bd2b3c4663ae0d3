//! Editor helpers: preview rendering, the AI tutor, and image assets.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::post,
};

use crate::auth::RequireUser;
use crate::editor::{SANDBOX_HEADERS, compose, extract_code_blocks};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ChatRequest, ChatResponse, GenerateImageRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{ChatMessage, ChatRole, CodeState};

pub fn assist_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/preview", post(preview))
        .route("/chat", post(chat))
        .route("/generate-image", post(generate_image))
}

/// Serves a composed document under a CSP sandbox so it runs in an
/// opaque origin.
pub fn sandboxed_document(code: &CodeState) -> Response {
    (SANDBOX_HEADERS, Html(compose(code))).into_response()
}

pub async fn preview(_auth: RequireUser, Json(code): Json<CodeState>) -> Response {
    sandboxed_document(&code)
}

/// Asks the tutor. Upstream trouble never surfaces as an error here; the
/// tutor answers with a fallback text instead.
pub async fn chat(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let history: Vec<ChatMessage> = req.history.into_iter().map(ChatMessage::from).collect();
    let answer = state.tutor.generate(&req.message, &req.code, &history).await;

    let message = ChatMessage::new(ChatRole::Assistant, answer);
    let blocks = extract_code_blocks(&message.id, &message.content);

    Ok::<_, ApiError>(Json(ApiResponse::success(ChatResponse { message, blocks })))
}

pub async fn generate_image(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateImageRequest>,
) -> impl IntoResponse {
    match state.images.generate(&req.prompt, req.asset_type).await {
        Ok(image) => Ok(Json(ApiResponse::success(image))),
        Err(Error::BadRequest(message)) => Err(ApiError::bad_request(message)),
        Err(e) => {
            tracing::error!("Image generation failed: {e}");
            Err(ApiError::internal("Failed to generate image"))
        }
    }
}
