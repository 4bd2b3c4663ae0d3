mod ai;
mod server;

pub use ai::AiConfig;
pub use server::{
    CONFIG_FILE_NAME, DB_FILE_NAME, DEFAULT_AUTOSAVE_SECS, DEFAULT_SESSION_TTL_DAYS, FileConfig,
    ServerConfig,
};
