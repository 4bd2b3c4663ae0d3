use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{
    Identity, PasswordHasher, RequireSession, SessionTokenGenerator, clear_session_cookie,
    session_cookie,
};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CheckUsernameRequest, CheckUsernameResponse, EditorSettings, LoginRequest, RegisterRequest, SessionResponse,
    UpdateProfileRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_display_name, validate_password, validate_username};
use crate::types::{Role, User};

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const USERNAME_TAKEN: &str = "Username is already taken";
const SESSION_ATTEMPTS: usize = 3;

pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/check-username", post(check_username))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/update-profile", post(update_profile))
        .route("/settings", get(settings))
}

/// Stores a fresh session for `user` and returns the raw token. Expired
/// sessions are swept first.
fn issue_session(state: &AppState, user: &User) -> Result<String, ApiError> {
    match state.store.delete_expired_sessions(Utc::now()) {
        Ok(0) => {}
        Ok(pruned) => tracing::debug!(pruned, "removed expired sessions"),
        Err(e) => tracing::warn!("Failed to prune expired sessions: {e}"),
    }

    let generator = SessionTokenGenerator::new();

    for _ in 0..SESSION_ATTEMPTS {
        let (session, raw_token) = generator
            .issue(&user.id, state.session_ttl)
            .api_err("Failed to create session")?;

        match state.store.create_session(&session) {
            Ok(()) => return Ok(raw_token),
            Err(Error::TokenLookupCollision) => {
                tracing::warn!("Session lookup collision, retrying");
            }
            Err(e) => {
                tracing::error!("Failed to store session: {e}");
                return Err(ApiError::internal("Failed to create session"));
            }
        }
    }

    Err(ApiError::internal("Failed to create session"))
}

fn session_response(state: &AppState, user: &User, status: StatusCode) -> Result<Response, ApiError> {
    let token = issue_session(state, user)?;
    let jar = CookieJar::new().add(session_cookie(
        token.clone(),
        state.session_ttl.num_seconds(),
    ));
    let body = SessionResponse {
        token,
        user: Identity::from(user),
    };

    Ok((status, jar, Json(ApiResponse::success(body))).into_response())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    if req.invite_code != state.invite_code {
        return Err(ApiError::bad_request("Invalid invite code"));
    }

    let username = req.username.trim();
    validate_username(username).map_err(ApiError::bad_request)?;
    let display_name = validate_display_name(&req.display_name)?;
    validate_password(&req.password)?;

    if state
        .store
        .get_user_by_username(username)
        .api_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::bad_request(USERNAME_TAKEN));
    }

    let password_hash = PasswordHasher::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        display_name: Some(display_name),
        password_hash,
        role: Role::Student,
        first_login: false,
        created_at: now,
        updated_at: now,
    };

    match state.store.create_user(&user) {
        Ok(()) => {}
        Err(Error::AlreadyExists) => return Err(ApiError::bad_request(USERNAME_TAKEN)),
        Err(e) => {
            tracing::error!("Failed to create user: {e}");
            return Err(ApiError::internal("Failed to create user"));
        }
    }

    tracing::info!(username = %user.username, "registered new student");
    session_response(&state, &user, StatusCode::CREATED)
}

/// Tells the login form whether the account exists and still needs
/// profile setup. Nothing about the password is revealed.
pub async fn check_username(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckUsernameRequest>,
) -> impl IntoResponse {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }

    let user = state
        .store
        .get_user_by_username(username)
        .api_err("Failed to check username")?;

    let response = CheckUsernameResponse {
        exists: user.is_some(),
        first_login: user.is_some_and(|u| u.first_login),
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

/// Accounts that still have to finish profile setup are let in by username
/// alone; everyone else needs the right password.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .store
        .get_user_by_username(req.username.trim())
        .api_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !user.first_login {
        let password = req.password.as_deref().unwrap_or_default();
        let valid = PasswordHasher::new()
            .verify(password, &user.password_hash)
            .api_err("Failed to verify password")?;
        if !valid {
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    }

    session_response(&state, &user, StatusCode::OK)
}

pub async fn logout(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state
        .store
        .delete_session(&auth.session.id)
        .api_err("Failed to end session")?;

    let jar = CookieJar::new().add(clear_session_cookie());
    Ok::<_, ApiError>((StatusCode::NO_CONTENT, jar))
}

pub async fn me(auth: RequireSession) -> impl IntoResponse {
    Json(ApiResponse::success(Identity::from(&auth.user)))
}

pub async fn settings(
    _auth: RequireSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(ApiResponse::success(EditorSettings {
        autosave_secs: state.autosave_secs,
    }))
}

/// Completes profile setup (or changes name and password later). All of
/// the user's sessions are revoked and a fresh one is returned, so the
/// caller's identity reflects the new state immediately.
pub async fn update_profile(
    auth: RequireSession,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Response, ApiError> {
    let display_name = validate_display_name(&req.display_name)?;
    validate_password(&req.new_password)?;

    let password_hash = PasswordHasher::new()
        .hash(&req.new_password)
        .api_err("Failed to hash password")?;

    let mut user = auth.user;
    user.display_name = Some(display_name);
    user.password_hash = password_hash;
    user.first_login = false;
    user.updated_at = Utc::now();

    state
        .store
        .update_user(&user)
        .api_err("Failed to update profile")?;

    let revoked = state
        .store
        .delete_user_sessions(&user.id)
        .api_err("Failed to revoke sessions")?;
    tracing::debug!(username = %user.username, revoked, "profile updated");

    session_response(&state, &user, StatusCode::OK)
}
