//! Retrieval-augmented answer assembly
//!
//! Turns ranked hits into a bounded context block and a grounded prompt,
//! then makes at most one generator call.


use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ranking::Hit;
use crate::{DocqaError, Result};

/// Reply sentinel when retrieval found nothing to ground an answer on
pub const NO_CONTEXT_REPLY: &str = "NO_CONTEXT";

/// Reply returned instead of calling an unconfigured generator
pub const NOT_CONFIGURED_REPLY: &str = "The AI engine is not configured (missing API key). \
     Set GOOGLE_API_KEY (or GEMINI_API_KEY) and restart the service.";

/// Text-generation capability consumed by the answer path
pub trait Generator: Send + Sync {
    /// Produce a completion for `prompt`
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Terminal outcome of an answer request
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Retrieval returned no hits; the generator was not called
    NoContext,
    /// No generator is configured; the generator was not called
    NotConfigured,
    Generated { reply: String, citations: Vec<Hit> },
}

impl Answer {
    #[inline]
    pub fn reply(&self) -> &str {
        match self {
            Self::NoContext => NO_CONTEXT_REPLY,
            Self::NotConfigured => NOT_CONFIGURED_REPLY,
            Self::Generated { reply, .. } => reply,
        }
    }

    #[inline]
    pub fn citations(&self) -> &[Hit] {
        match self {
            Self::Generated { citations, .. } => citations,
            Self::NoContext | Self::NotConfigured => &[],
        }
    }

    #[inline]
    pub fn into_reply(self) -> AnswerReply {
        match self {
            Self::Generated { reply, citations } => AnswerReply { reply, citations },
            other => AnswerReply {
                reply: other.reply().to_string(),
                citations: Vec::new(),
            },
        }
    }
}

/// Serializable `{reply, citations}` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerReply {
    pub reply: String,
    pub citations: Vec<Hit>,
}

/// Render hits as `[scope:doc p.page] excerpt` blocks separated by blank lines
#[inline]
pub fn build_context(hits: &[Hit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}:{} p.{}] {}", hit.scope, hit.doc, hit.page, hit.excerpt))
        .join("\n\n")
}

/// Grounded prompt for `question` over an already-built context block
#[inline]
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer strictly from the context below.\n\
         If the information is missing from the context, say so plainly.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\
         Answer concisely, citing references as [scope:doc p.page] when useful.",
        context, question
    )
}

/// Assemble an answer from ranked hits
///
/// Zero hits short-circuit to [`Answer::NoContext`]. Otherwise the generator
/// is called exactly once; its failure is reported as an upstream error and
/// is not retried here.
#[inline]
pub fn assemble(question: &str, hits: Vec<Hit>, generator: &dyn Generator) -> Result<Answer> {
    if hits.is_empty() {
        info!("No context for question, skipping generation");
        return Ok(Answer::NoContext);
    }

    let context = build_context(&hits);
    let prompt = build_prompt(question, &context);
    debug!(
        "Generating answer from {} hits ({} prompt chars)",
        hits.len(),
        prompt.chars().count()
    );

    let reply = generator.generate(&prompt).map_err(|e| {
        warn!("Generation failed: {:#}", e);
        DocqaError::Upstream(format!("{:#}", e))
    })?;

    Ok(Answer::Generated {
        reply: reply.trim().to_string(),
        citations: hits,
    })
}
