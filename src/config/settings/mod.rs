
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::DEFAULT_SLICE_SIZE;
use crate::ranking::{DEFAULT_ANSWER_EXCERPT_CHARS, DEFAULT_PREVIEW_EXCERPT_CHARS, ExcerptLimits};

/// Environment variables consulted for the generation API key, in order
pub const API_KEY_VARIABLES: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

const MAX_EMBEDDING_DIMENSIONS: usize = 4096;
const MAX_DEFAULT_K: usize = 100;
const MAX_TIMEOUT_SECONDS: u64 = 600;
const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Page size in characters for raw text ingestion
    pub slice_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            slice_size: DEFAULT_SLICE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Hits returned when a request does not specify `k`
    pub default_k: usize,
    pub preview_excerpt_chars: usize,
    pub answer_excerpt_chars: usize,
    /// Excerpt length in one-line search summaries
    pub summary_excerpt_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            preview_excerpt_chars: DEFAULT_PREVIEW_EXCERPT_CHARS,
            answer_excerpt_chars: DEFAULT_ANSWER_EXCERPT_CHARS,
            summary_excerpt_chars: 200,
        }
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn excerpt_limits(&self) -> ExcerptLimits {
        ExcerptLimits {
            preview: self.preview_excerpt_chars,
            answer: self.answer_excerpt_chars,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    #[default]
    MeanCodepoint,
    HashedToken,
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MeanCodepoint => f.write_str("mean-codepoint"),
            Self::HashedToken => f.write_str("hashed-token"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Vector length for the hashed-token backend
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dimensions: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            timeout_seconds: 60,
            retry_attempts: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    DirectoryError,
    #[error("Invalid slice size: {0} (must be at least 1)")]
    InvalidSliceSize(usize),
    #[error("Invalid default k: {0} (must be between 1 and 100)")]
    InvalidDefaultK(usize),
    #[error("Invalid {0}: {1} (must be at least 1)")]
    InvalidExcerptLength(&'static str, usize),
    #[error("Invalid embedding dimensions: {0} (must be between 1 and 4096)")]
    InvalidEmbeddingDimensions(usize),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory: `<platform config dir>/docqa`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("docqa"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when absent
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.slice_size == 0 {
            return Err(ConfigError::InvalidSliceSize(self.store.slice_size));
        }
        self.retrieval.validate()?;
        self.embedding.validate()?;
        self.generation.validate()?;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_DEFAULT_K).contains(&self.default_k) {
            return Err(ConfigError::InvalidDefaultK(self.default_k));
        }

        for (name, value) in [
            ("preview excerpt length", self.preview_excerpt_chars),
            ("answer excerpt length", self.answer_excerpt_chars),
            ("summary excerpt length", self.summary_excerpt_chars),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidExcerptLength(name, value));
            }
        }

        Ok(())
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_EMBEDDING_DIMENSIONS).contains(&self.dimensions) {
            return Err(ConfigError::InvalidEmbeddingDimensions(self.dimensions));
        }
        Ok(())
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        self.api_base_url()?;

        if !(1..=MAX_TIMEOUT_SECONDS).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.api_base)
            .map_err(|_| ConfigError::InvalidUrl(self.api_base.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(self.api_base.clone()));
        }
        Ok(url)
    }

    /// API key from the process environment
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(|name| std::env::var(name).ok())
    }
}

/// First non-blank value among [`API_KEY_VARIABLES`], using `lookup` to read them
#[inline]
pub fn resolve_api_key<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_VARIABLES
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
