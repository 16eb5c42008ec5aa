//! Fixed-size character chunker with constant overlap.
//!
//! Chunk `n` starts at character `n * (chunk_size - overlap)`. Once the
//! remaining text fits in `chunk_size`, it all goes into the final chunk, so
//! the last chunk may be shorter than the others.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 2000, overlap: 500 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking requires 0 < overlap < chunk_size (got overlap={}, chunk_size={})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of adjacent chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into overlapping chunks. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every character boundary, including the end.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;
        if total == 0 {
            return Vec::new();
        }

        let ChunkingConfig { chunk_size, overlap } = self.config;
        let stride = self.config.stride();
        let mut chunks = Vec::with_capacity(total / stride + 1);
        let mut start = 0usize;
        loop {
            let remaining = total - start;
            let end = if remaining <= chunk_size { total } else { start + chunk_size };
            chunks.push(Chunk {
                sequence_index: chunks.len(),
                start,
                text: text[bounds[start]..bounds[end]].to_string(),
                overlap_with_predecessor: if start == 0 { 0 } else { overlap },
            });
            if end == total {
                break;
            }
            start += stride;
        }
        chunks
    }
}

/// Rebuild the source text by dropping each chunk's overlap with its predecessor.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.extend(chunk.text.chars().skip(chunk.overlap_with_predecessor));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size, overlap }).expect("valid config")
    }

    #[test]
    fn splits_letters_with_single_char_overlap() {
        let chunks = chunker(4, 1).split("ABCDEFGHIJ");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ABCD", "DEFG", "GHIJ"]);
        assert_eq!(chunks[0].overlap_with_predecessor, 0);
        assert_eq!(chunks[2].overlap_with_predecessor, 1);
        assert_eq!(chunks[2].start, 6);
        assert_eq!(reconstruct(&chunks), "ABCDEFGHIJ");
    }

    #[test]
    fn final_chunk_absorbs_short_remainder() {
        let chunks = chunker(4, 1).split("ABCDEFGH");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ABCD", "DEFG", "GH"]);
        assert_eq!(reconstruct(&chunks), "ABCDEFGH");
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = chunker(2000, 500).split("Short text.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text.");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunker(4, 1).split("").is_empty());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "héllo wörld ünïcode";
        let chunks = chunker(5, 2).split(text);
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.char_len(), 5);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn rejects_bad_overlap() {
        assert!(Chunker::new(ChunkingConfig { chunk_size: 4, overlap: 0 }).is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 4, overlap: 4 }).is_err());
        assert!(Chunker::new(ChunkingConfig { chunk_size: 4, overlap: 9 }).is_err());
    }
}
