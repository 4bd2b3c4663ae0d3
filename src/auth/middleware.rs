use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{SessionValidationError, extract_session_token, validate_session};
use crate::server::AppState;
use crate::types::{Session, User};

/// Extractor that requires a valid session, including sessions of accounts
/// that still have to finish profile setup.
pub struct RequireSession {
    pub session: Session,
    pub user: User,
}

/// Extractor that requires a valid session of an account that completed
/// profile setup.
pub struct RequireUser {
    pub session: Session,
    pub user: User,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidSession,
    SessionExpired,
    SetupRequired,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!("Rejected request: {self:?}");

        let (status, message) = match self {
            AuthError::MissingAuth
            | AuthError::InvalidScheme
            | AuthError::InvalidSession
            | AuthError::SessionExpired => (StatusCode::UNAUTHORIZED, "Not logged in"),
            AuthError::SetupRequired => (StatusCode::FORBIDDEN, "Profile setup required"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                axum::http::HeaderValue::from_static("Bearer realm=\"vibecoder\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (session, user) = extract_and_validate_session(parts, state)?;
        Ok(RequireSession { session, user })
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (session, user) = extract_and_validate_session(parts, state)?;

        if user.first_login {
            return Err(AuthError::SetupRequired);
        }

        Ok(RequireUser { session, user })
    }
}

fn extract_and_validate_session(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<(Session, User), AuthError> {
    let raw_token = extract_session_token(&parts.headers)
        .map_err(|e| match e {
            SessionValidationError::InvalidScheme => AuthError::InvalidScheme,
            _ => AuthError::InternalError,
        })?
        .ok_or(AuthError::MissingAuth)?;

    let validated = validate_session(state, &raw_token).map_err(|e| match e {
        SessionValidationError::InvalidScheme => AuthError::InvalidScheme,
        SessionValidationError::InvalidToken => AuthError::InvalidSession,
        SessionValidationError::SessionExpired => AuthError::SessionExpired,
        SessionValidationError::InternalError => AuthError::InternalError,
    })?;

    Ok((validated.session, validated.user))
}
