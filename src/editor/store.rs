//! Client-side holder of the three buffers.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::snapshot::Snapshot;
use crate::types::{CodeState, Language, Project};

pub type SharedCodeStore = Arc<Mutex<CodeStore>>;

/// Owns the buffers plus the bookkeeping autosave needs: a dirty flag, the
/// project the buffers belong to, and a revision counter that moves on every
/// edit. Whether a save also snapshots a version is never decided here.
#[derive(Debug)]
pub struct CodeStore {
    code: CodeState,
    dirty: bool,
    project_id: Option<String>,
    revision: watch::Sender<u64>,
}

impl Default for CodeStore {
    fn default() -> Self {
        Self::new(CodeState::default())
    }
}

impl CodeStore {
    #[must_use]
    pub fn new(code: CodeState) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            code,
            dirty: false,
            project_id: None,
            revision,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedCodeStore {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn get(&self, language: Language) -> &str {
        self.code.get(language)
    }

    #[must_use]
    pub fn code(&self) -> &CodeState {
        &self.code
    }

    /// Replaces one buffer. Setting a buffer to its current text is a no-op.
    pub fn set(&mut self, language: Language, text: impl Into<String>) {
        let text = text.into();
        if self.code.get(language) == text {
            return;
        }
        self.code.set(language, text);
        self.touch();
    }

    /// Binds the store to a stored project and takes over its buffers.
    /// The result is clean: nothing differs from what the server has.
    pub fn load_from(&mut self, project: &Project) {
        self.code = project.code.clone();
        self.project_id = Some(project.id.clone());
        self.dirty = false;
        self.revision.send_modify(|r| *r += 1);
    }

    #[must_use]
    pub fn bound_project(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    #[must_use]
    pub fn serialize(&self, name: impl Into<String>) -> Snapshot {
        Snapshot::new(name, self.code.clone())
    }

    /// Replaces all buffers with an uploaded snapshot.
    pub fn import(&mut self, snapshot: Snapshot) {
        self.code = snapshot.code;
        self.touch();
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Notifies on every edit; the value is the new revision.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Clears the dirty flag after a save of `saved_revision` succeeded,
    /// unless an edit landed in the meantime. Returns whether it cleared.
    pub fn mark_saved(&mut self, saved_revision: u64) -> bool {
        if self.revision() == saved_revision {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision.send_modify(|r| *r += 1);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: "p1".to_string(),
            title: "Site".to_string(),
            code: CodeState::new("<p>x</p>", "p {}", "let a;"),
            owner_id: "u1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_set_marks_dirty_and_bumps_revision() {
        let mut store = CodeStore::default();
        assert!(!store.is_dirty());

        store.set(Language::Style, "body {}");
        assert!(store.is_dirty());
        assert_eq!(store.revision(), 1);
        assert_eq!(store.get(Language::Style), "body {}");

        store.set(Language::Style, "body {}");
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_load_from_is_clean() {
        let mut store = CodeStore::default();
        store.set(Language::Markup, "draft");
        store.load_from(&project());

        assert!(!store.is_dirty());
        assert_eq!(store.bound_project(), Some("p1"));
        assert_eq!(store.get(Language::Script), "let a;");
    }

    #[test]
    fn test_import_replaces_everything() {
        let mut store = CodeStore::new(CodeState::new("a", "b", "c"));
        store.import(Snapshot::new("x", CodeState::new("<p>new</p>", "", "")));

        assert_eq!(store.code(), &CodeState::new("<p>new</p>", "", ""));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_serialize_then_import_round_trips() {
        let mut store = CodeStore::new(CodeState::new("<h1>t</h1>", "h1 {}", "alert(1)"));
        let snapshot = store.serialize("export");
        let original = store.code().clone();

        store.set(Language::Markup, "changed");
        store.import(snapshot);
        assert_eq!(store.code(), &original);
    }

    #[test]
    fn test_mark_saved_respects_inflight_edits() {
        let mut store = CodeStore::default();
        store.set(Language::Script, "one");
        let saving = store.revision();

        store.set(Language::Script, "two");
        assert!(!store.mark_saved(saving));
        assert!(store.is_dirty());

        assert!(store.mark_saved(store.revision()));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_subscribe_sees_edits() {
        let mut store = CodeStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.set(Language::Markup, "<p></p>");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
