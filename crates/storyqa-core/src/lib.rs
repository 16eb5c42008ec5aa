//! storyqa-core
//!
//! Domain types, the chunker, the collaborator traits (`Embedder`,
//! `DocumentSource`, `AnswerGenerator`), configuration and the on-disk
//! document library shared by the other `storyqa-*` crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod library;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
