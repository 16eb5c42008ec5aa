//! Domain types shared by the chunker, the index and the session layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dense embedding produced by an `Embedder`.
pub type Vector = Vec<f32>;

/// Shelf a document lives on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Book,
    Movie,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Book, Category::Movie];

    /// Directory name under the library root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Book => "books",
            Category::Movie => "movies",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Book => f.write_str("book"),
            Category::Movie => f.write_str("movie"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "book" | "books" => Ok(Category::Book),
            "movie" | "movies" | "script" => Ok(Category::Movie),
            other => Err(format!("unknown category '{other}' (expected book or movie)")),
        }
    }
}

/// Identity of a selectable document: the cache key for its index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentId {
    pub category: Category,
    pub title: String,
}

impl DocumentId {
    pub fn new(category: Category, title: impl Into<String>) -> Self {
        Self { category, title: title.into() }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.title)
    }
}

/// An overlapping segment of document text; the unit of retrieval.
///
/// - `sequence_index`: position within the document, starting at 0
/// - `start`: character offset of the first character in the source text
/// - `text`: the segment content, at most `chunk_size` characters
/// - `overlap_with_predecessor`: characters shared with the previous chunk
///   (0 for the first chunk)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub sequence_index: usize,
    pub start: usize,
    pub text: String,
    pub overlap_with_predecessor: usize,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A chunk paired with its similarity to a query. Higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Top-K chunks for one query, best first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Chunk texts in rank order, scores dropped.
    pub fn into_texts(self) -> Vec<String> {
        self.hits.into_iter().map(|h| h.chunk.text).collect()
    }
}
