use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocqaError>;

#[derive(Error, Debug)]
pub enum DocqaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for DocqaError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod generation;
pub mod mcp;
pub mod ranking;
pub mod scope;
pub mod search_log;
pub mod store;

pub use engine::Engine;
