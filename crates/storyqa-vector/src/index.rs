//! Brute-force cosine index over one document's chunks.
//!
//! Typical flow:
//! 1) `VectorIndex::build` embeds chunks batch by batch, checking the deadline
//!    and the cancel flag before each batch
//! 2) `search` scores every entry against the query vector and returns the
//!    top K, best first, earlier chunks winning ties

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use storyqa_core::traits::Embedder;
use storyqa_core::types::{Chunk, DocumentId, RetrievalResult, ScoredChunk, Vector};
use storyqa_core::{Error, Result};

/// Shared flag a caller can set to stop an in-flight build.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the flag for the next build.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub timeout: Option<Duration>,
    /// Chunks embedded per `embed_batch` call.
    pub batch_size: usize,
    pub cancel: Option<CancelFlag>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { timeout: None, batch_size: 32, cancel: None }
    }
}

impl BuildOptions {
    fn check(&self, started: Instant) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(Error::BuildCancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(Error::BuildTimedOut { elapsed, timeout });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    chunk: Chunk,
    vector: Vector,
    norm: f32,
}

impl Entry {
    fn new(chunk: Chunk, vector: Vector) -> Self {
        let norm = l2_norm(&vector);
        Self { chunk, vector, norm }
    }
}

/// Immutable (chunk, vector) pairs for exactly one document.
#[derive(Debug)]
pub struct VectorIndex {
    doc_id: DocumentId,
    dim: usize,
    entries: Vec<Entry>,
    fingerprint: String,
}

impl VectorIndex {
    /// Embed every chunk and store it. Fails with `EmptyDocument` when there
    /// is nothing to index.
    pub fn build(
        doc_id: DocumentId,
        chunks: &[Chunk],
        embedder: &dyn Embedder,
        options: &BuildOptions,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(doc_id));
        }
        let started = Instant::now();
        let dim = embedder.dim();
        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(options.batch_size.max(1)) {
            options.check(started)?;
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != dim {
                    return Err(Error::DimensionMismatch { expected: dim, got: vector.len() });
                }
                entries.push(Entry::new(chunk.clone(), vector));
            }
            tracing::trace!(doc = %doc_id, done = entries.len(), total = chunks.len(), "embedded batch");
        }
        options.check(started)?;

        let index = Self::assemble(doc_id, dim, entries);
        tracing::info!(
            doc = %index.doc_id,
            chunks = index.len(),
            dim,
            elapsed_ms = started.elapsed().as_millis() as u64,
            fingerprint = %&index.fingerprint[..16],
            "built vector index"
        );
        Ok(index)
    }

    /// Index pre-computed vectors. All vectors must share the first one's dimension.
    pub fn from_pairs(doc_id: DocumentId, pairs: Vec<(Chunk, Vector)>) -> Result<Self> {
        let dim = pairs.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut entries = Vec::with_capacity(pairs.len());
        for (chunk, vector) in pairs {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, got: vector.len() });
            }
            entries.push(Entry::new(chunk, vector));
        }
        Ok(Self::assemble(doc_id, dim, entries))
    }

    fn assemble(doc_id: DocumentId, dim: usize, entries: Vec<Entry>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for e in &entries {
            hasher.update(&(e.chunk.sequence_index as u64).to_le_bytes());
            hasher.update(e.chunk.text.as_bytes());
        }
        let fingerprint = hasher.finalize().to_hex().to_string();
        Self { doc_id, dim, entries, fingerprint }
    }

    /// Top `k` entries by cosine similarity, descending; ties go to the lower
    /// `sequence_index`. `k` larger than the index is clamped.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        if self.entries.is_empty() {
            return Err(Error::IndexEmpty);
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: query.len() });
        }
        let query_norm = l2_norm(query);
        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .iter()
            .map(|e| (cosine_with_norms(query, query_norm, &e.vector, e.norm), e))
            .collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa).then(a.chunk.sequence_index.cmp(&b.chunk.sequence_index))
        });
        scored.truncate(k.min(self.entries.len()));
        let hits = scored
            .into_iter()
            .map(|(score, e)| ScoredChunk { chunk: e.chunk.clone(), score })
            .collect();
        Ok(RetrievalResult { hits })
    }

    pub fn doc_id(&self) -> &DocumentId { &self.doc_id }
    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    /// blake3 hex digest of the indexed chunk texts.
    pub fn fingerprint(&self) -> &str { &self.fingerprint }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed norms; 0.0 when either vector has zero length.
fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}
