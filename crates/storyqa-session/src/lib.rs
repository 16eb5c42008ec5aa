//! storyqa-session
//!
//! Session-scoped state (selection, index cache, chat history) and the
//! retrieval orchestrator that turns a question into grounding context for
//! an answer generator.

pub mod generator;
pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use generator::ExtractiveGenerator;
pub use orchestrator::{answer_context, ask, retrieve, select_document, Reply, Selection};
pub use prompt::{PromptTemplate, INSTRUCTION_TEMPLATE};
pub use session::{ChatMessage, Role, Session};
