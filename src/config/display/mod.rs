
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use super::{API_KEY_VARIABLES, Config};

/// Print the effective configuration and API key availability to stderr
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Store:").bold().yellow());
    eprintln!("  Slice size: {}", style(config.store.slice_size).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Default k: {}", style(config.retrieval.default_k).cyan());
    eprintln!(
        "  Excerpt chars (preview/answer/summary): {}/{}/{}",
        style(config.retrieval.preview_excerpt_chars).cyan(),
        style(config.retrieval.answer_excerpt_chars).cyan(),
        style(config.retrieval.summary_excerpt_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embedding:").bold().yellow());
    eprintln!("  Backend: {}", style(config.embedding.backend).cyan());
    eprintln!("  Dimensions: {}", style(config.embedding.dimensions).cyan());

    eprintln!();
    eprintln!("{}", style("Generation:").bold().yellow());
    eprintln!("  Model: {}", style(&config.generation.model).cyan());
    match config.generation.api_base_url() {
        Ok(url) => eprintln!("  API base: {}", style(url).cyan()),
        Err(e) => eprintln!("  API base: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Timeout: {}s, attempts: {}",
        style(config.generation.timeout_seconds).cyan(),
        style(config.generation.retry_attempts).cyan()
    );

    eprintln!();
    for (name, set) in key_status(|name| std::env::var(name).ok()) {
        let marker = if set {
            style("set").green()
        } else {
            style("not set").dim()
        };
        eprintln!("  {}: {}", name, marker);
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Whether each API key variable holds a non-blank value
fn key_status<F>(lookup: F) -> Vec<(&'static str, bool)>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_VARIABLES
        .iter()
        .map(|name| {
            let set = lookup(name).is_some_and(|value| !value.trim().is_empty());
            (*name, set)
        })
        .collect()
}
