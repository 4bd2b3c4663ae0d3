pub mod gate;
mod helpers;
mod middleware;
mod password;
mod token;

pub use helpers::{
    Identity, SESSION_COOKIE, clear_session_cookie, resolve_identity, session_cookie,
};
pub use middleware::{AuthError, RequireSession, RequireUser};
pub use password::{MIN_PASSWORD_LEN, PasswordHasher};
pub use token::{SessionTokenGenerator, parse_token};
