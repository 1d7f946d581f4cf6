//! Engine facade
//!
//! Owns one chunk store, one search log, the fingerprint backend and an
//! optional generator, and exposes every retrieval operation in terms of
//! resolved scope hints.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::answer::{self, Answer, Generator};
use crate::config::Config;
use crate::embeddings::{build_embedder, slice_pages};
use crate::generation::build_generator;
use crate::ranking::{ExcerptBound, Hit, Ranker, excerpt};
use crate::scope::ScopeResolver;
use crate::search_log::{LogEntry, Role, SearchLog};
use crate::store::{ChunkStore, DocumentSummary, PageInput};
use crate::{DocqaError, Result};

/// Result of an ingest call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub name: String,
    #[serde(rename = "pages")]
    pub page_count: usize,
    pub scopes: Vec<String>,
}

/// One-line-per-hit search summary with the underlying hits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReply {
    pub reply: String,
    pub citations: Vec<Hit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ok: bool,
    pub scopes: usize,
    pub docs_total: usize,
    pub ai_ready: bool,
}

/// Reply used by [`Engine::search_reply`] when nothing matched
pub const NO_MATCHES_REPLY: &str = "No matches.";

#[derive(Debug, Clone, Copy)]
struct Limits {
    slice_size: usize,
    default_k: usize,
    summary_excerpt_chars: usize,
}

pub struct Engine {
    store: Arc<ChunkStore>,
    ranker: Ranker,
    log: SearchLog,
    generator: Option<Arc<dyn Generator>>,
    limits: Limits,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("ai_ready", &self.ai_ready())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine from `config` with an explicit generator
    #[inline]
    pub fn new(config: &Config, generator: Option<Arc<dyn Generator>>) -> Self {
        let store = Arc::new(ChunkStore::new(build_embedder(&config.embedding)));
        let ranker = Ranker::new(Arc::clone(&store), config.retrieval.excerpt_limits());

        Self {
            store,
            ranker,
            log: SearchLog::new(),
            generator,
            limits: Limits {
                slice_size: config.store.slice_size,
                default_k: config.retrieval.default_k,
                summary_excerpt_chars: config.retrieval.summary_excerpt_chars,
            },
        }
    }

    /// Build an engine whose generator comes from the environment's API key
    ///
    /// # Errors
    /// Returns a configuration error when `config` fails validation or the
    /// generator client cannot be built from it.
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let generator = build_generator(&config.generation, config.generation.api_key())
            .map_err(|e| DocqaError::Configuration(format!("{:#}", e)))?;
        Ok(Self::new(config, generator))
    }

    #[inline]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[inline]
    pub fn search_log(&self) -> &SearchLog {
        &self.log
    }

    #[inline]
    pub fn default_k(&self) -> usize {
        self.limits.default_k
    }

    /// Whether a generator is configured
    #[inline]
    pub fn ai_ready(&self) -> bool {
        self.generator.is_some()
    }

    /// Store pre-chunked pages under every write scope
    #[inline]
    pub fn ingest_pages(
        &self,
        scopes: &ScopeResolver,
        name: Option<&str>,
        pages: Vec<PageInput>,
    ) -> Result<IngestReport> {
        let name = document_name(name);
        let targets = scopes.resolve_write();
        let page_count = self.store.ingest_many(&targets, &name, pages)?;

        Ok(IngestReport {
            name,
            page_count,
            scopes: targets,
        })
    }

    /// Slice raw text into pages and store them under every write scope
    ///
    /// `slice_size` falls back to the configured size.
    #[inline]
    pub fn ingest_text(
        &self,
        scopes: &ScopeResolver,
        name: Option<&str>,
        text: &str,
        slice_size: Option<usize>,
    ) -> Result<IngestReport> {
        let pages = slice_pages(text, slice_size.unwrap_or(self.limits.slice_size))?
            .into_iter()
            .map(|slice| PageInput::new(slice.page, slice.text))
            .collect();
        self.ingest_pages(scopes, name, pages)
    }

    /// Documents visible from the read scopes
    #[inline]
    pub fn list(&self, scopes: &ScopeResolver) -> Vec<DocumentSummary> {
        self.store.list(&scopes.resolve_read())
    }

    /// Top-`k` hits over the read scopes; `k` falls back to the configured default
    #[inline]
    pub fn rank(
        &self,
        scopes: &ScopeResolver,
        query: &str,
        k: Option<usize>,
        allow_list: Option<&[String]>,
        bound: ExcerptBound,
    ) -> Result<Vec<Hit>> {
        self.ranker.rank(
            query.trim(),
            &scopes.resolve_read(),
            k.unwrap_or(self.limits.default_k),
            allow_list,
            bound,
        )
    }

    /// Ranked preview hits rendered as a short text summary
    #[inline]
    pub fn search_reply(
        &self,
        scopes: &ScopeResolver,
        query: &str,
        k: Option<usize>,
    ) -> Result<SearchReply> {
        let citations = self.rank(scopes, query, k, None, ExcerptBound::Preview)?;
        let reply = self.summarize(&citations);
        Ok(SearchReply { reply, citations })
    }

    /// Grounded answer over the read scopes
    ///
    /// An unconfigured generator short-circuits before ranking.
    #[inline]
    pub fn answer(
        &self,
        scopes: &ScopeResolver,
        question: &str,
        k: Option<usize>,
        allow_list: Option<&[String]>,
    ) -> Result<Answer> {
        let Some(generator) = &self.generator else {
            info!("Answer requested without a configured generator");
            return Ok(Answer::NotConfigured);
        };

        let hits = self.rank(scopes, question, k, allow_list, ExcerptBound::Answer)?;
        let answer = answer::assemble(question.trim(), hits, generator.as_ref())?;
        debug!(
            "Answer produced with {} citations",
            answer.citations().len()
        );
        Ok(answer)
    }

    /// Free-form message straight to the generator, without retrieval
    #[inline]
    pub fn converse(&self, message: &str) -> Result<String> {
        let Some(generator) = &self.generator else {
            return Ok(Answer::NotConfigured.reply().to_string());
        };

        if message.trim().is_empty() {
            return Err(DocqaError::Validation(
                "message must not be empty".to_string(),
            ));
        }

        let reply = generator
            .generate(message)
            .map_err(|e| DocqaError::Upstream(format!("{:#}", e)))?;
        Ok(reply.trim().to_string())
    }

    /// Append to the log of `scope`; returns the new entry count
    #[inline]
    pub fn log_append(
        &self,
        scope: &str,
        role: Role,
        content: &str,
        citations: Option<Vec<Hit>>,
    ) -> usize {
        self.log.append(scope, role, content, citations)
    }

    #[inline]
    pub fn log_entries(&self, scope: &str) -> Vec<LogEntry> {
        self.log.entries(scope)
    }

    #[inline]
    pub fn log_migrate(&self, src: &str, dst: &str) -> usize {
        self.log.migrate(src, dst)
    }

    #[inline]
    pub fn log_clear(&self, scope: &str) -> usize {
        self.log.clear(scope)
    }

    #[inline]
    pub fn health(&self) -> Health {
        let stats = self.store.stats();
        Health {
            ok: true,
            scopes: stats.scopes,
            docs_total: stats.documents,
            ai_ready: self.ai_ready(),
        }
    }

    fn summarize(&self, hits: &[Hit]) -> String {
        if hits.is_empty() {
            return NO_MATCHES_REPLY.to_string();
        }

        hits.iter()
            .map(|hit| {
                format!(
                    "- [{}] {} p.{} ({:.2}): {}…",
                    hit.scope,
                    hit.doc,
                    hit.page,
                    hit.score,
                    excerpt(&hit.excerpt, self.limits.summary_excerpt_chars)
                )
            })
            .join("\n")
    }
}

/// Trimmed caller-supplied name, or `doc_<6 hex>` when absent or blank
fn document_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            let suffix: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
            format!("doc_{}", suffix)
        }
    }
}
