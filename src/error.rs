use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("session lookup collision")]
    TokenLookupCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("project limit of {0} reached")]
    ProjectLimit(usize),

    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    #[error("upstream service error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, Error>;
