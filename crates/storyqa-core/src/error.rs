use std::time::Duration;

use thiserror::Error;

use crate::types::DocumentId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Input too large: {len} exceeds the embedder limit of {max}")]
    InputTooLarge { len: usize, max: usize },

    #[error("Document '{0}' produced no chunks")]
    EmptyDocument(DocumentId),

    #[error("Index build timed out after {elapsed:?} (limit {timeout:?})")]
    BuildTimedOut { elapsed: Duration, timeout: Duration },

    #[error("Index build cancelled")]
    BuildCancelled,

    #[error("No index ready: select the document and wait for it to load first")]
    NoIndexReady,

    #[error("Index has no entries")]
    IndexEmpty,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Document '{0}' not found")]
    DocumentNotFound(DocumentId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Errors the user can fix by (re)selecting a document rather than by
    /// changing their question.
    pub fn needs_document(&self) -> bool {
        matches!(
            self,
            Error::NoIndexReady
                | Error::EmptyDocument(_)
                | Error::DocumentNotFound(_)
                | Error::BuildTimedOut { .. }
                | Error::BuildCancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
