use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use super::password::PasswordHasher;
use crate::error::{Error, Result};
use crate::types::Session;

const TOKEN_PREFIX: &str = "vibe";
const LOOKUP_LENGTH: usize = 8;
const SECRET_LENGTH: usize = 24;
const SECRET_BYTES: usize = 12;

/// Issues opaque session tokens of the form `vibe_<lookup>_<secret>`.
///
/// The lookup part locates the session row, the whole token is verified
/// against the stored Argon2id hash.
pub struct SessionTokenGenerator {
    hasher: PasswordHasher,
}

impl Default for SessionTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: PasswordHasher::new(),
        }
    }

    /// Generates a new token. Returns (raw_token, lookup, hash)
    pub fn generate(&self) -> Result<(String, String, String)> {
        let lookup = generate_lookup();
        let secret = generate_secret();
        let raw_token = build_token(&lookup, &secret);
        let hash = self.hasher.hash(&raw_token)?;
        Ok((raw_token, lookup, hash))
    }

    /// Creates a session row for `user_id` valid for `ttl`, returning it
    /// together with the raw token that is handed to the client once.
    pub fn issue(&self, user_id: &str, ttl: Duration) -> Result<(Session, String)> {
        let (raw_token, lookup, hash) = self.generate()?;
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: user_id.to_string(),
            created_at: now,
            expires_at: now + ttl,
            last_used_at: None,
        };
        Ok((session, raw_token))
    }

    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        self.hasher.verify(token, hash)
    }
}

#[must_use]
fn generate_lookup() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid[..LOOKUP_LENGTH].to_string()
}

#[must_use]
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    hex[..SECRET_LENGTH].to_string()
}

#[must_use]
fn build_token(lookup: &str, secret: &str) -> String {
    format!("{TOKEN_PREFIX}_{lookup}_{secret}")
}

/// Parses a token string into its components (lookup, secret)
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    if lookup.len() != LOOKUP_LENGTH || secret.len() != SECRET_LENGTH || secret.contains('_') {
        return Err(Error::InvalidTokenFormat);
    }

    Ok((lookup.to_string(), secret.to_string()))
}

#[must_use]
pub fn is_expired(expires_at: &DateTime<Utc>) -> bool {
    expires_at < &Utc::now()
}
