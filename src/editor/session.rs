//! Editor state for one student: buffers, active tab, chat and applied
//! code blocks, threaded explicitly through every handler.

use std::collections::HashSet;
use std::sync::{MutexGuard, PoisonError};

use super::code_blocks::{BlockIdentity, CodeBlock, extract_code_blocks};
use super::compositor::compose;
use super::snapshot::Snapshot;
use super::store::{CodeStore, SharedCodeStore};
use crate::error::{Error, Result};
use crate::types::{ChatMessage, ChatRole, CodeState, Language};

/// Number of earlier messages sent along with a question.
pub const CHAT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    Code(Language),
}

/// A question ready to send: the recorded message and the context that goes
/// with it.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub message: ChatMessage,
    pub history: Vec<ChatMessage>,
}

/// State of one open playground: buffers, active tab, chat log, and which
/// code blocks have been applied.
pub struct EditorSession {
    store: SharedCodeStore,
    active_tab: Tab,
    messages: Vec<ChatMessage>,
    applied: HashSet<BlockIdentity>,
}

impl EditorSession {
    pub fn new(store: SharedCodeStore) -> Self {
        Self {
            store,
            active_tab: Tab::default(),
            messages: Vec::new(),
            applied: HashSet::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &SharedCodeStore {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, CodeStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn edit(&mut self, language: Language, text: impl Into<String>) {
        self.lock().set(language, text);
    }

    /// Overwrites the block's target buffer with the block's code.
    ///
    /// Applying the same block again leaves the buffers unchanged and the
    /// block marked as applied.
    pub fn apply_block(&mut self, block: &CodeBlock) -> Result<Language> {
        let Some(target) = block.target() else {
            return Err(Error::BadRequest(format!(
                "code block tagged {:?} has no target buffer",
                block.tag.as_deref().unwrap_or("")
            )));
        };

        self.lock().set(target, block.code.clone());
        self.applied.insert(block.identity.clone());
        self.active_tab = Tab::Code(target);
        Ok(target)
    }

    #[must_use]
    pub fn is_applied(&self, identity: &BlockIdentity) -> bool {
        self.applied.contains(identity)
    }

    /// Records a question. The returned history holds the messages before
    /// it, at most [`CHAT_HISTORY_LIMIT`] of them.
    pub fn record_user_message(&mut self, content: impl Into<String>) -> ChatTurn {
        let history = self.chat_history().to_vec();
        let message = ChatMessage::new(ChatRole::User, content);
        self.messages.push(message.clone());
        ChatTurn { message, history }
    }

    pub fn record_assistant_message(
        &mut self,
        content: impl Into<String>,
    ) -> (ChatMessage, Vec<CodeBlock>) {
        let message = ChatMessage::new(ChatRole::Assistant, content);
        let blocks = extract_code_blocks(&message.id, &message.content);
        self.messages.push(message.clone());
        (message, blocks)
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The most recent messages, oldest first.
    #[must_use]
    pub fn chat_history(&self) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(CHAT_HISTORY_LIMIT);
        &self.messages[start..]
    }

    /// Loads an uploaded snapshot. The conversation was about other code, so
    /// it starts over.
    pub fn import(&mut self, snapshot: Snapshot) {
        self.lock().import(snapshot);
        self.messages.clear();
        self.applied.clear();
    }

    /// Recomposes the preview document from the current buffers.
    #[must_use]
    pub fn preview(&self) -> String {
        compose(self.lock().code())
    }

    #[must_use]
    pub fn code(&self) -> CodeState {
        self.lock().code().clone()
    }
}
