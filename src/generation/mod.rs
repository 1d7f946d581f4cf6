// Generation module
// Concrete text-generation backends behind the answer Generator trait

pub mod gemini;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::answer::Generator;
use crate::config::GenerationConfig;

pub use gemini::GeminiClient;

/// Build the configured generator, or `None` when no API key is available
#[inline]
pub fn build_generator(
    config: &GenerationConfig,
    api_key: Option<String>,
) -> Result<Option<Arc<dyn Generator>>> {
    let Some(api_key) = api_key else {
        info!("No generation API key found; answers will report the engine as unconfigured");
        return Ok(None);
    };

    let client = GeminiClient::new(config, api_key)?;
    info!("Generation enabled with model {}", config.model);
    Ok(Some(Arc::new(client)))
}
