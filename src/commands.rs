//! CLI command implementations

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::Engine;
use crate::config::{Config, get_config_dir};
use crate::mcp::ActionServer;
use crate::scope::ScopeResolver;

/// Resolve the config directory from an override or the platform default
#[inline]
pub fn resolve_config_dir(config_dir: Option<PathBuf>) -> Result<PathBuf> {
    match config_dir {
        Some(dir) => Ok(dir),
        None => get_config_dir().context("Failed to determine config directory"),
    }
}

/// Serve the action protocol on stdio until EOF
#[inline]
pub async fn serve(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let engine = Engine::from_config(&config).context("Failed to initialize engine")?;
    let server = ActionServer::new(Arc::new(engine));
    server.serve_stdio().await
}

/// Write the effective configuration to `config.toml`
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    config.save()?;
    eprintln!("Configuration written to {}", config.config_file_path().display());
    Ok(())
}

/// Options for a one-shot question over local text files
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    pub files: Vec<PathBuf>,
    pub conversation: Option<String>,
    pub namespace: Option<String>,
    pub k: Option<usize>,
}

/// Ingest `files`, then answer (or search, without a generator) and print the result
#[inline]
pub fn ask(config_dir: &Path, options: &AskOptions) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let engine = Engine::from_config(&config).context("Failed to initialize engine")?;
    let scopes = ScopeResolver::new(
        options.conversation.as_deref(),
        options.namespace.as_deref(),
    );

    for path in &options.files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.file_name().map(|name| name.to_string_lossy());
        let report = engine.ingest_text(&scopes, name.as_deref(), &text, None)?;
        info!(
            "Ingested {} ({} pages) into {:?}",
            report.name, report.page_count, report.scopes
        );
    }

    if !engine.ai_ready() {
        warn!("No API key found; showing search results instead of an answer");
        let result = engine.search_reply(&scopes, &options.question, options.k)?;
        println!("{}", result.reply);
        return Ok(());
    }

    let answer = engine.answer(&scopes, &options.question, options.k, None)?;
    println!("{}", answer.reply());
    for hit in answer.citations() {
        println!("  [{}:{} p.{}] ({:.2})", hit.scope, hit.doc, hit.page, hit.score);
    }

    Ok(())
}
