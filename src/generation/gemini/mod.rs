
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::answer::Generator;
use crate::config::GenerationConfig;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    base_url: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("retry_attempts", &self.retry_attempts)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        let base_url = config
            .api_base_url()
            .context("Failed to parse generation API base URL")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            agent,
            retry_attempts: config.retry_attempts.max(1),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a completion for `prompt`, concatenating the text parts of
    /// the first candidate
    #[inline]
    pub fn generate_content(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating content with {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let url = self.endpoint()?;
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .header("x-goog-api-key", &self.api_key)
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate content")?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Generation response contained no candidates"))?;

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        debug!("Generated {} characters", text.len());
        Ok(text)
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join(&format!("/v1beta/models/{}:generateContent", self.model))
            .context("Failed to build generation URL")
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(ureq::Error::StatusCode(status)) if status < 500 => {
                    warn!("Client error (status {}), not retrying", status);
                    return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                }
                Err(
                    error @ (ureq::Error::StatusCode(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Request failed: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                }
            }
        }

        error!("All attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

impl Generator for GeminiClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt)
    }
}
