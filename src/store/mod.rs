mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// A user may own at most this many projects at once.
pub const MAX_PROJECTS_PER_OWNER: usize = 3;

/// Store defines the database interface.
///
/// Every project operation takes the caller's user id; rows owned by someone
/// else behave exactly like missing rows.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn delete_user_sessions(&self, user_id: &str) -> Result<usize>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;
    /// Removes sessions that expired before `now`.
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // Project operations
    /// Inserts the project unless its owner already has `limit` projects,
    /// in which case storage is left untouched and `Error::ProjectLimit` is
    /// returned.
    fn create_project(&self, project: &Project, limit: usize) -> Result<()>;
    fn count_projects(&self, owner_id: &str) -> Result<usize>;
    /// Most recently updated first.
    fn list_projects(&self, owner_id: &str) -> Result<Vec<Project>>;
    fn get_project(&self, owner_id: &str, id: &str) -> Result<Option<Project>>;
    /// Applies `patch`. With `save_version` the buffers as they were before
    /// the update are kept as a `ProjectVersion`.
    fn update_project(
        &self,
        owner_id: &str,
        id: &str,
        patch: &ProjectPatch,
        save_version: bool,
    ) -> Result<Option<Project>>;
    fn delete_project(&self, owner_id: &str, id: &str) -> Result<bool>;
    /// Most recent first.
    fn list_project_versions(&self, owner_id: &str, project_id: &str)
    -> Result<Vec<ProjectVersion>>;
}
