//! Per-session index cache keyed by document identity.
//!
//! States: `Empty`, `Building(id)`, `Ready(id)`, `Stale(id)`. Builds and
//! document switches are serialized by `build_lock`; the slot itself is only
//! locked briefly, so queries never wait on an in-flight build and instead
//! see `NoIndexReady`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use storyqa_core::types::DocumentId;
use storyqa_core::{Error, Result};

use crate::index::VectorIndex;

/// Snapshot of the cache state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CacheState {
    Empty,
    Building(DocumentId),
    Ready(DocumentId),
    Stale(DocumentId),
}

#[derive(Debug)]
pub enum SelectOutcome {
    /// The requested document was already loaded.
    Reused(Arc<VectorIndex>),
    Built(Arc<VectorIndex>),
}

impl SelectOutcome {
    pub fn index(&self) -> &Arc<VectorIndex> {
        match self {
            SelectOutcome::Reused(index) | SelectOutcome::Built(index) => index,
        }
    }

    pub fn was_built(&self) -> bool {
        matches!(self, SelectOutcome::Built(_))
    }
}

#[derive(Debug)]
enum Slot {
    Empty,
    Building(DocumentId),
    Ready(Arc<VectorIndex>),
    Stale(DocumentId),
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resets the slot to `Empty` unless disarmed, so a panicking build cannot
/// leave the cache in `Building`.
struct BuildingGuard<'a> {
    slot: &'a Mutex<Slot>,
    armed: bool,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *lock(self.slot) = Slot::Empty;
        }
    }
}

#[derive(Debug)]
pub struct IndexCache {
    slot: Mutex<Slot>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl Default for IndexCache {
    fn default() -> Self {
        Self { slot: Mutex::new(Slot::Empty), build_lock: Mutex::new(()), builds: AtomicUsize::new(0) }
    }
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        match &*lock(&self.slot) {
            Slot::Empty => CacheState::Empty,
            Slot::Building(id) => CacheState::Building(id.clone()),
            Slot::Ready(index) => CacheState::Ready(index.doc_id().clone()),
            Slot::Stale(id) => CacheState::Stale(id.clone()),
        }
    }

    /// Successful builds since creation.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Make `doc_id` the ready document. Reuses the current index when it
    /// already belongs to `doc_id`; otherwise drops it and runs `build`.
    /// A failed build leaves the cache `Empty`.
    pub fn select<F>(&self, doc_id: &DocumentId, build: F) -> Result<SelectOutcome>
    where
        F: FnOnce() -> Result<VectorIndex>,
    {
        let _build = lock(&self.build_lock);
        {
            let mut slot = lock(&self.slot);
            if let Slot::Ready(index) = &*slot {
                if index.doc_id() == doc_id {
                    tracing::debug!(doc = %doc_id, "index already ready");
                    return Ok(SelectOutcome::Reused(Arc::clone(index)));
                }
                tracing::info!(from = %index.doc_id(), to = %doc_id, "discarding index for previous document");
            }
            *slot = Slot::Building(doc_id.clone());
        }

        let mut guard = BuildingGuard { slot: &self.slot, armed: true };
        let result = build();
        guard.armed = false;

        let mut slot = lock(&self.slot);
        match result {
            Ok(index) if index.doc_id() == doc_id => {
                let index = Arc::new(index);
                *slot = Slot::Ready(Arc::clone(&index));
                self.builds.fetch_add(1, Ordering::SeqCst);
                Ok(SelectOutcome::Built(index))
            }
            Ok(index) => {
                *slot = Slot::Empty;
                Err(Error::InvalidConfig(format!(
                    "index built for '{}' while selecting '{}'",
                    index.doc_id(),
                    doc_id
                )))
            }
            Err(e) => {
                tracing::warn!(doc = %doc_id, error = %e, "index build failed");
                *slot = Slot::Empty;
                Err(e)
            }
        }
    }

    /// The ready index for `doc_id`, or `NoIndexReady`.
    pub fn current(&self, doc_id: &DocumentId) -> Result<Arc<VectorIndex>> {
        match &*lock(&self.slot) {
            Slot::Ready(index) if index.doc_id() == doc_id => Ok(Arc::clone(index)),
            _ => Err(Error::NoIndexReady),
        }
    }

    /// Mark the ready index stale and drop it; the next `select` rebuilds
    /// even for the same document.
    pub fn invalidate(&self) {
        let mut slot = lock(&self.slot);
        if let Slot::Ready(index) = &*slot {
            let id = index.doc_id().clone();
            tracing::info!(doc = %id, "index invalidated");
            *slot = Slot::Stale(id);
        }
    }

    /// Drop whatever is cached. Waits for an in-flight build to finish first.
    pub fn clear(&self) {
        let _build = lock(&self.build_lock);
        *lock(&self.slot) = Slot::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyqa_core::types::{Category, Chunk};

    fn id(title: &str) -> DocumentId {
        DocumentId::new(Category::Book, title)
    }

    fn tiny_index(doc: &DocumentId) -> Result<VectorIndex> {
        let chunk = Chunk { sequence_index: 0, start: 0, text: doc.title.clone(), overlap_with_predecessor: 0 };
        VectorIndex::from_pairs(doc.clone(), vec![(chunk, vec![1.0, 0.0])])
    }

    #[test]
    fn starts_empty_and_rejects_queries() {
        let cache = IndexCache::new();
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(matches!(cache.current(&id("A")), Err(Error::NoIndexReady)));
    }

    #[test]
    fn reselecting_same_document_does_not_rebuild() {
        let cache = IndexCache::new();
        let a = id("A");
        assert!(cache.select(&a, || tiny_index(&a)).unwrap().was_built());
        let again = cache.select(&a, || panic!("must not rebuild")).unwrap();
        assert!(!again.was_built());
        assert_eq!(cache.build_count(), 1);
        assert_eq!(cache.state(), CacheState::Ready(a));
    }

    #[test]
    fn switching_documents_replaces_index() {
        let cache = IndexCache::new();
        let (a, b) = (id("A"), id("B"));
        cache.select(&a, || tiny_index(&a)).unwrap();
        cache.select(&b, || tiny_index(&b)).unwrap();
        assert_eq!(cache.state(), CacheState::Ready(b.clone()));
        assert!(matches!(cache.current(&a), Err(Error::NoIndexReady)));
        assert_eq!(cache.current(&b).unwrap().doc_id(), &b);
        assert_eq!(cache.build_count(), 2);
    }

    #[test]
    fn failed_build_leaves_cache_empty() {
        let cache = IndexCache::new();
        let (a, b) = (id("A"), id("B"));
        cache.select(&a, || tiny_index(&a)).unwrap();
        let err = cache.select(&b, || Err(Error::EmptyDocument(b.clone()))).unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(_)));
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.current(&a).is_err());
        // Next selection retries.
        cache.select(&b, || tiny_index(&b)).unwrap();
        assert_eq!(cache.state(), CacheState::Ready(b));
    }

    #[test]
    fn panicking_build_does_not_stick_in_building() {
        let cache = IndexCache::new();
        let a = id("A");
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = cache.select(&a, || panic!("embedder exploded"));
        }));
        assert!(outcome.is_err());
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[test]
    fn mismatched_build_result_is_rejected() {
        let cache = IndexCache::new();
        let (a, b) = (id("A"), id("B"));
        assert!(cache.select(&a, || tiny_index(&b)).is_err());
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[test]
    fn invalidate_forces_rebuild_of_same_document() {
        let cache = IndexCache::new();
        let a = id("A");
        cache.select(&a, || tiny_index(&a)).unwrap();
        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Stale(a.clone()));
        assert!(cache.current(&a).is_err());
        assert!(cache.select(&a, || tiny_index(&a)).unwrap().was_built());
        assert_eq!(cache.build_count(), 2);

        cache.clear();
        assert_eq!(cache.state(), CacheState::Empty);
    }
}
