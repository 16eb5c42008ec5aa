use crate::error::Result;
use crate::types::{DocumentId, Vector};

/// Maps text to a fixed-dimension vector. Chunks and queries must go through
/// the same instance so that their vectors are comparable.
pub trait Embedder: Send + Sync {
    /// Dimension of every vector this embedder returns.
    fn dim(&self) -> usize;
    /// Largest input accepted, in characters.
    fn max_len(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vector>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Resolves a document identity to its extracted text.
pub trait DocumentSource: Send + Sync {
    fn load(&self, id: &DocumentId) -> Result<String>;
}

/// Produces an answer from an instruction, the retrieved context and the question.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, instruction: &str, context: &[String], question: &str) -> Result<String>;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed(&self, text: &str) -> Result<Vector> { (**self).embed(text) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vector>> { (**self).embed_batch(texts) }
}
