// Configuration management module
// TOML settings for storage, retrieval, embedding and generation

pub mod display;
pub mod settings;

pub use display::show_config;
pub use settings::{
    API_KEY_VARIABLES, Config, ConfigError, EmbeddingBackend, EmbeddingConfig, GenerationConfig,
    RetrievalConfig, StoreConfig, resolve_api_key,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
