use serde::{Deserialize, Serialize};
use storyqa_core::config::Settings;
use storyqa_core::types::DocumentId;
use storyqa_core::Result;
use storyqa_vector::{BuildOptions, CancelFlag, IndexCache};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Everything one user interaction owns: the selected document, its index
/// cache and the chat history. Passed explicitly into the orchestrator.
#[derive(Debug)]
pub struct Session {
    settings: Settings,
    cache: IndexCache,
    selection: Option<DocumentId>,
    history: Vec<ChatMessage>,
    cancel: CancelFlag,
}

impl Session {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            cache: IndexCache::new(),
            selection: None,
            history: Vec::new(),
            cancel: CancelFlag::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// The document the user last picked, whether or not it loaded.
    pub fn selection(&self) -> Option<&DocumentId> {
        self.selection.as_ref()
    }

    pub(crate) fn set_selection(&mut self, id: DocumentId) {
        self.selection = Some(id);
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub(crate) fn record(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    /// Handle another thread can use to abort the in-flight build, or the
    /// next one if none is running. Re-armed when that build attempt ends.
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub(crate) fn build_options(&self) -> BuildOptions {
        BuildOptions {
            timeout: self.settings.retrieval.build_timeout(),
            batch_size: self.settings.retrieval.build_batch_size,
            cancel: Some(self.cancel.clone()),
        }
    }

    /// End of session: drop the index, the selection and the history.
    pub fn end(&mut self) {
        self.cache.clear();
        self.selection = None;
        self.history.clear();
    }
}
