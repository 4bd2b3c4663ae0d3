//! Debounced autosave of a bound [`CodeStore`](super::store::CodeStore).
//!
//! Every path that persists buffers goes through [`SaveCoordinator::save`]:
//! the debounce timer, an explicit save button, and the final save on exit.

use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::store::{CodeStore, SharedCodeStore};
use crate::config::DEFAULT_AUTOSAVE_SECS;
use crate::error::Result;
use crate::types::CodeState;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(DEFAULT_AUTOSAVE_SECS);

/// Where saved buffers go, typically the project API.
#[async_trait]
pub trait ProjectSink: Send + Sync {
    async fn save(&self, project_id: &str, code: &CodeState, save_version: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// Debounce timer. Saves only dirty buffers and never creates a version.
    Timer,
    /// User-requested. Always saves and passes the caller's version flag.
    Explicit { save_version: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Nothing changed since the last save.
    Clean,
    /// The store is not bound to a project.
    Unbound,
}

pub struct SaveCoordinator {
    store: SharedCodeStore,
    sink: Arc<dyn ProjectSink>,
}

impl SaveCoordinator {
    pub fn new(store: SharedCodeStore, sink: Arc<dyn ProjectSink>) -> Self {
        Self { store, sink }
    }

    #[must_use]
    pub fn store(&self) -> &SharedCodeStore {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, CodeStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn save(&self, trigger: SaveTrigger) -> Result<SaveOutcome> {
        // Copy out under the lock; the request itself runs lock-free.
        let (project_id, code, revision) = {
            let store = self.lock();
            if trigger == SaveTrigger::Timer && !store.is_dirty() {
                return Ok(SaveOutcome::Clean);
            }
            let Some(project_id) = store.bound_project() else {
                return Ok(SaveOutcome::Unbound);
            };
            (project_id.to_string(), store.code().clone(), store.revision())
        };

        let save_version = match trigger {
            SaveTrigger::Timer => false,
            SaveTrigger::Explicit { save_version } => save_version,
        };

        self.sink.save(&project_id, &code, save_version).await?;

        if !self.lock().mark_saved(revision) {
            debug!(project_id, "buffers changed during save; staying dirty");
        }
        Ok(SaveOutcome::Saved)
    }
}

/// Spawns the debounce loop: after an edit it waits `delay`, restarting the
/// wait on every further edit, then performs a [`SaveTrigger::Timer`] save.
/// Runs until `cancel` fires.
pub fn spawn_autosave(
    coordinator: Arc<SaveCoordinator>,
    delay: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut edits = coordinator.lock().subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                changed = edits.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }

            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    changed = edits.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    () = tokio::time::sleep(delay) => break,
                }
            }

            match coordinator.save(SaveTrigger::Timer).await {
                Ok(outcome) => debug!(?outcome, "autosave"),
                Err(e) => warn!("Autosave failed: {e}"),
            }
        }
    })
}
