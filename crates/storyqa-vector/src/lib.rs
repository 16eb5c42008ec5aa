//! storyqa-vector
//!
//! In-memory similarity index over one document's chunks (`index`) and the
//! per-session cache that decides when an index is built, reused or dropped
//! (`cache`).

pub mod cache;
pub mod index;

pub use cache::{CacheState, IndexCache, SelectOutcome};
pub use index::{BuildOptions, CancelFlag, VectorIndex};
