use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::assist::assist_router;
use super::auth::{auth_router, user_router};
use super::pages::page_router;
use super::projects::project_router;
use crate::ai::{ImageService, TutorService};
use crate::auth::gate::page_gate;
use crate::config::{DEFAULT_AUTOSAVE_SECS, DEFAULT_SESSION_TTL_DAYS};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Shared secret students need to self-register.
    pub invite_code: String,
    pub session_ttl: chrono::Duration,
    pub autosave_secs: u64,
    pub tutor: TutorService,
    pub images: ImageService,
}

impl AppState {
    /// State with the default session lifetime, no tutor backend, and
    /// placeholder images.
    pub fn new(store: Arc<dyn Store>, invite_code: impl Into<String>) -> Self {
        Self {
            store,
            invite_code: invite_code.into(),
            session_ttl: chrono::Duration::days(DEFAULT_SESSION_TTL_DAYS),
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
            tutor: TutorService::unconfigured(),
            images: ImageService::default(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.session_ttl = chrono::Duration::days(days);
        self
    }

    #[must_use]
    pub fn with_autosave_secs(mut self, secs: u64) -> Self {
        self.autosave_secs = secs;
        self
    }

    #[must_use]
    pub fn with_tutor(mut self, tutor: TutorService) -> Self {
        self.tutor = tutor;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: ImageService) -> Self {
        self.images = images;
        self
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let pages = page_router().route_layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        page_gate,
    ));

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_router())
        .nest("/api/user", user_router())
        .nest("/api", project_router())
        .nest("/api", assist_router())
        .merge(pages)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
