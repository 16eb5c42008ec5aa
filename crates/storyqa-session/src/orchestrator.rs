//! Retrieval orchestration: select a document, retrieve context for a
//! question, hand it to the answer generator.

use std::time::{Duration, Instant};

use storyqa_core::chunker::Chunker;
use storyqa_core::traits::{AnswerGenerator, DocumentSource, Embedder};
use storyqa_core::types::{DocumentId, RetrievalResult};
use storyqa_core::{Error, Result};
use storyqa_vector::{BuildOptions, IndexCache, SelectOutcome, VectorIndex};

use crate::prompt::INSTRUCTION_TEMPLATE;
use crate::session::{ChatMessage, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Same document as before; nothing was rebuilt.
    Reused,
    Built { chunks: usize, elapsed: Duration },
}

/// Answer text plus the scored chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub context: RetrievalResult,
}

/// Make `doc_id` the active document, building its index unless it is
/// already ready. The selection changes even when loading fails, so later
/// questions report `NoIndexReady` instead of answering from another document.
///
/// A cancel requested through `Session::cancel_handle` before or during the
/// build aborts it; the flag is re-armed once the build attempt ends.
pub fn select_document(
    session: &mut Session,
    doc_id: DocumentId,
    source: &dyn DocumentSource,
    embedder: &dyn Embedder,
) -> Result<Selection> {
    session.set_selection(doc_id.clone());
    let chunking = session.settings().chunking;
    if chunking.chunk_size > embedder.max_len() {
        return Err(Error::InvalidConfig(format!(
            "chunking.chunk_size ({}) exceeds the embedder input limit ({})",
            chunking.chunk_size,
            embedder.max_len()
        )));
    }
    let chunker = Chunker::new(chunking)?;
    let options = session.build_options();
    let started = Instant::now();

    let outcome = session.cache().select(&doc_id, || {
        let built = load_and_build(&doc_id, source, &chunker, embedder, &options);
        if let Some(cancel) = &options.cancel {
            cancel.reset();
        }
        built
    })?;

    Ok(match outcome {
        SelectOutcome::Reused(_) => Selection::Reused,
        SelectOutcome::Built(index) => Selection::Built { chunks: index.len(), elapsed: started.elapsed() },
    })
}

fn load_and_build(
    doc_id: &DocumentId,
    source: &dyn DocumentSource,
    chunker: &Chunker,
    embedder: &dyn Embedder,
    options: &BuildOptions,
) -> Result<VectorIndex> {
    let text = source.load(doc_id)?;
    // Image-only PDFs extract to whitespace and page breaks.
    if text.trim().is_empty() {
        return Err(Error::EmptyDocument(doc_id.clone()));
    }
    let chunks = chunker.split(&text);
    tracing::info!(doc = %doc_id, chars = text.chars().count(), chunks = chunks.len(), "chunked document");
    VectorIndex::build(doc_id.clone(), &chunks, embedder, options)
}

/// Top `k` scored chunks for `query` from the ready index of `doc_id`.
pub fn retrieve(
    cache: &IndexCache,
    doc_id: &DocumentId,
    query: &str,
    embedder: &dyn Embedder,
    k: usize,
) -> Result<RetrievalResult> {
    let index = cache.current(doc_id)?;
    let query_vector = embedder.embed(query)?;
    let result = index.search(&query_vector, k)?;
    for (rank, hit) in result.hits.iter().enumerate() {
        tracing::debug!(doc = %doc_id, rank, seq = hit.chunk.sequence_index, score = hit.score, "retrieved chunk");
    }
    Ok(result)
}

/// Ordered chunk texts grounding `query`; scores are dropped.
pub fn answer_context(
    cache: &IndexCache,
    doc_id: &DocumentId,
    query: &str,
    embedder: &dyn Embedder,
    k: usize,
) -> Result<Vec<String>> {
    Ok(retrieve(cache, doc_id, query, embedder, k)?.into_texts())
}

fn answer(
    session: &Session,
    question: &str,
    embedder: &dyn Embedder,
    generator: &dyn AnswerGenerator,
) -> Result<Reply> {
    let doc_id = session.selection().ok_or(Error::NoIndexReady)?;
    let k = session.settings().retrieval.top_k;
    let context = retrieve(session.cache(), doc_id, question, embedder, k)?;
    let texts: Vec<String> = context.hits.iter().map(|h| h.chunk.text.clone()).collect();
    let text = generator.generate(INSTRUCTION_TEMPLATE, &texts, question)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Generation("generator returned an empty answer".into()));
    }
    Ok(Reply { text: text.to_string(), context })
}

/// Answer `question` about the selected document and record both sides of
/// the exchange in the session history. Failures are recorded too.
pub fn ask(
    session: &mut Session,
    question: &str,
    embedder: &dyn Embedder,
    generator: &dyn AnswerGenerator,
) -> Result<Reply> {
    session.record(ChatMessage::user(question));
    match answer(session, question, embedder, generator) {
        Ok(reply) => {
            session.record(ChatMessage::assistant(reply.text.clone()));
            Ok(reply)
        }
        Err(e) => {
            session.record(ChatMessage::assistant(format!("An error occurred: {e}")));
            Err(e)
        }
    }
}
