//! The playground itself: buffers, preview, tutor code blocks, autosave.

pub mod autosave;
pub mod code_blocks;
pub mod compositor;
pub mod session;
pub mod snapshot;
pub mod store;

pub use autosave::{
    DEFAULT_AUTOSAVE_DELAY, ProjectSink, SaveCoordinator, SaveOutcome, SaveTrigger, spawn_autosave,
};
pub use code_blocks::{BlockIdentity, BlockLanguage, CodeBlock, extract_code_blocks};
pub use compositor::{DOCUMENT_SHELL, SANDBOX_FLAGS, SANDBOX_HEADERS, compose, iframe_srcdoc};
pub use session::{CHAT_HISTORY_LIMIT, ChatTurn, EditorSession, Tab};
pub use snapshot::{Snapshot, starter_code};
pub use store::{CodeStore, SharedCodeStore};
