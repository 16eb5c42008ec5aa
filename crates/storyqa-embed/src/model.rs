use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use storyqa_core::config::EmbeddingConfig;
use storyqa_core::traits::Embedder;
use storyqa_core::types::Vector;
use storyqa_core::{Error, Result};
use tokenizers::Tokenizer;

use crate::check_len;
use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub(crate) fn candle_err(e: candle_core::Error) -> Error {
    Error::Embedding(format!("embedding model: {e}"))
}

/// Special tokens the tokenizer adds around every input.
const SPECIAL_TOKENS: usize = 2;

/// XLM-RoBERTa encoder (BGE-M3 layout) with masked mean pooling.
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    /// Longest token sequence the position embeddings can address.
    max_tokens: usize,
    max_input_chars: usize,
}

impl EmbeddingModel {
    /// Load `tokenizer.json`, `config.json` and `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path, config: &EmbeddingConfig) -> Result<Self> {
        let device = select_device(&config.device)?;
        tracing::info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::InvalidConfig(format!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let config_path = model_dir.join("config.json");
        let model_config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", config_path.display(), e)))?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin")).map_err(candle_err)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&model_config, vb).map_err(candle_err)?;
        // RoBERTa positions start after the padding index.
        let max_tokens = model_config
            .max_position_embeddings
            .saturating_sub(model_config.pad_token_id as usize + 1);
        tracing::info!(dim = model_config.hidden_size, max_tokens, "embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
            dim: model_config.hidden_size,
            max_tokens,
            max_input_chars: config.max_input_chars,
        })
    }

    fn forward(&self, text: &str) -> Result<Vector> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_tokens, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(candle_err)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(candle_err)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(candle_err)?;
        pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(candle_err)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }

    /// Character cap, tightened so that any accepted text also fits the
    /// model's token window (each token covers at least one character).
    fn max_len(&self) -> usize {
        self.max_input_chars.min(self.max_tokens.saturating_sub(SPECIAL_TOKENS))
    }

    fn embed(&self, text: &str) -> Result<Vector> {
        check_len(text, self.max_input_chars)?;
        let start = Instant::now();
        let v = self.forward(text)?;
        if start.elapsed().as_millis() > 100 {
            tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(v)
    }
}

/// Configured directory first, then `APP_MODEL_DIR`, then `models/bge-m3`.
pub(crate) fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(storyqa_core::config::expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3")]);
    for p in candidates {
        if p.exists() {
            return Ok(p);
        }
    }
    Err(Error::InvalidConfig("Could not locate embedding model directory".into()))
}
