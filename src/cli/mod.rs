mod admin;
mod auth;
mod chat;
mod commands;
pub mod credentials;
pub mod http_client;
mod preview;
mod project;
pub mod workspace;

pub use admin::{run_admin_init, run_admin_seed_students, run_admin_users};
pub use auth::{run_auth_login, run_auth_logout, run_auth_setup};
pub use chat::{run_chat, run_image};
pub use commands::{AdminCommands, AuthCommands, ChatArgs, ImageArgs, ProjectCommands};
pub use preview::run_preview;
pub use project::{
    run_project_create, run_project_delete, run_project_edit, run_project_list, run_project_pull,
    run_project_push, run_project_versions,
};

use crate::config::DB_FILE_NAME;
use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE_NAME);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'vibecoder admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
