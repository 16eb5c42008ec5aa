//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults + `storyqa.toml` +
//! `storyqa.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_CHUNKING__CHUNK_SIZE=1000`). Provides helpers to expand `~` and
//! `${VAR}` and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the answer generator per question.
    pub top_k: usize,
    /// Abort index builds that run longer than this.
    pub build_timeout_secs: Option<u64>,
    /// Chunks embedded between deadline checks.
    pub build_batch_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4, build_timeout_secs: None, build_batch_size: 32 }
    }
}

impl RetrievalConfig {
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimension: usize,
    pub max_input_chars: usize,
    /// Use the hashing embedder instead of loading a model.
    pub use_fake: bool,
    pub model_dir: Option<String>,
    /// `auto`, `cpu` or `metal`; only read by the model embedder.
    pub device: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            max_input_chars: 8192,
            use_fake: true,
            model_dir: None,
            device: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LibraryConfig {
    pub root: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self { root: "./library".to_string() }
    }
}

/// Typed view over the whole configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub library: LibraryConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.build_batch_size == 0 {
            return Err(Error::InvalidConfig("retrieval.build_batch_size must be at least 1".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be at least 1".into()));
        }
        if !matches!(self.embedding.device.as_str(), "auto" | "cpu" | "metal") {
            return Err(Error::InvalidConfig(format!(
                "embedding.device must be auto, cpu or metal (got '{}')",
                self.embedding.device
            )));
        }
        if self.chunking.chunk_size > self.embedding.max_input_chars {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_size ({}) exceeds embedding.max_input_chars ({})",
                self.chunking.chunk_size, self.embedding.max_input_chars
            )));
        }
        Ok(())
    }

    /// Library root, relative paths taken from `base` (the config directory).
    pub fn library_root(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.library.root)
    }
}

pub struct Config {
    figment: Figment,
    base: PathBuf,
}

impl Config {
    /// Load from the working directory using `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("storyqa.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("storyqa.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("storyqa.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("storyqa.test.toml"))),
            other => tracing::debug!(env = other, "no environment overlay for this RUST_ENV"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, base: dir.to_path_buf() })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Directory the TOML files were read from.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
