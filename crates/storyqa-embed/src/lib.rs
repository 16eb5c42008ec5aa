//! storyqa-embed
//!
//! Embedder implementations. `HashingEmbedder` is deterministic and needs no
//! model files; with the `model` feature, `EmbeddingModel` runs a local
//! transformer through candle.

use std::hash::{Hash, Hasher};

use storyqa_core::config::EmbeddingConfig;
use storyqa_core::traits::Embedder;
use storyqa_core::types::Vector;
use storyqa_core::{Error, Result};
use twox_hash::XxHash64;

#[cfg(feature = "model")]
mod device;
#[cfg(feature = "model")]
mod model;
#[cfg(feature = "model")]
mod pool;
#[cfg(feature = "model")]
mod tokenize;

#[cfg(feature = "model")]
pub use model::EmbeddingModel;
#[cfg(feature = "model")]
pub use pool::masked_mean_l2;

/// Reject text longer than `max` characters.
pub(crate) fn check_len(text: &str, max: usize) -> Result<()> {
    let len = text.chars().count();
    if len > max {
        return Err(Error::InputTooLarge { len, max });
    }
    Ok(())
}

/// Bag-of-words feature hashing: lowercased word tokens are hashed with
/// XxHash64 into `dim` buckets, then the vector is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    max_input_chars: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize, max_input_chars: usize) -> Self {
        Self { dim: dim.max(1), max_input_chars }
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_input_chars }

    fn embed(&self, text: &str) -> Result<Vector> {
        check_len(text, self.max_input_chars)?;
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

/// Pick the embedder described by `config`. `APP_USE_FAKE_EMBEDDINGS=1`
/// forces the hashing embedder regardless of the config.
pub fn default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let forced = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if forced || config.use_fake {
        tracing::info!(dim = config.dimension, "using hashing embedder");
        return Ok(Box::new(HashingEmbedder::new(config.dimension, config.max_input_chars)));
    }
    model_embedder(config)
}

#[cfg(feature = "model")]
fn model_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let dir = model::resolve_model_dir(config.model_dir.as_deref())?;
    Ok(Box::new(EmbeddingModel::load(&dir, config)?))
}

#[cfg(not(feature = "model"))]
fn model_embedder(_config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    Err(Error::InvalidConfig(
        "embedding.use_fake is false but storyqa-embed was built without the `model` feature".into(),
    ))
}
