//! Route gate for the browser-facing pages.
//!
//! Anonymous visitors are sent to the login page, accounts that still have
//! to finish profile setup are pinned to the setup page, and the setup page
//! is closed for everybody else.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::helpers::{Identity, resolve_identity};
use crate::server::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const SETUP_PATH: &str = "/setup";
pub const HOME_PATH: &str = "/";

const PUBLIC_PATHS: [&str; 3] = [LOGIN_PATH, "/register", "/api/auth"];

/// `path` is one of the public paths or lies below one of them.
fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path.strip_prefix(*public)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

#[must_use]
pub fn decide(path: &str, identity: Option<&Identity>) -> GateDecision {
    if is_public(path) {
        return GateDecision::Allow;
    }

    let Some(identity) = identity else {
        return GateDecision::Redirect(LOGIN_PATH);
    };

    let on_setup = path == SETUP_PATH;
    match (identity.first_login, on_setup) {
        (true, false) => GateDecision::Redirect(SETUP_PATH),
        (false, true) => GateDecision::Redirect(HOME_PATH),
        _ => GateDecision::Allow,
    }
}

/// Applies [`decide`] to every request passing through the page router.
pub async fn page_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = resolve_identity(&state, request.headers());

    match decide(request.uri().path(), identity.as_ref()) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(to) => Redirect::to(to).into_response(),
    }
}
