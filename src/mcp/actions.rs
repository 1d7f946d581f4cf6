//! Built-in actions
//!
//! Each action reads its parameters from the request, resolves scope hints
//! and calls into the [`Engine`]. Generator-backed actions run on the
//! blocking pool.

use crate::Engine;
use crate::mcp::errors::{ActionError, ActionResult};
use crate::mcp::protocol::ActionRequest;
use crate::mcp::server::{ActionHandler, ActionServer};
use crate::ranking::Hit;
use crate::search_log::Role;
use crate::store::PageInput;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

pub const GENERAL_CONVERSATION: &str = "general_conversation";
pub const DOCQA_SEARCH: &str = "docqa_search";
pub const DOCQA_ANSWER: &str = "docqa_answer";
pub const DOCQA_INGEST: &str = "docqa_ingest";
pub const DOCQA_LIST: &str = "docqa_list";
pub const SEARCH_LOG_APPEND: &str = "search_log_append";
pub const SEARCH_LOG_ENTRIES: &str = "search_log_entries";
pub const SEARCH_LOG_MIGRATE: &str = "search_log_migrate";
pub const SEARCH_LOG_CLEAR: &str = "search_log_clear";
pub const HEALTH: &str = "health";

/// Register every built-in action on `server`
#[inline]
pub fn register_defaults(server: &mut ActionServer) {
    let engine = Arc::clone(server.engine());

    server.register_action(GENERAL_CONVERSATION, ConversationAction::new(Arc::clone(&engine)));
    server.register_action(DOCQA_SEARCH, SearchAction::new(Arc::clone(&engine)));
    server.register_action(DOCQA_ANSWER, AnswerAction::new(Arc::clone(&engine)));
    server.register_action(DOCQA_INGEST, IngestAction::new(Arc::clone(&engine)));
    server.register_action(DOCQA_LIST, ListAction::new(Arc::clone(&engine)));
    server.register_action(SEARCH_LOG_APPEND, LogAppendAction::new(Arc::clone(&engine)));
    server.register_action(SEARCH_LOG_ENTRIES, LogEntriesAction::new(Arc::clone(&engine)));
    server.register_action(SEARCH_LOG_MIGRATE, LogMigrateAction::new(Arc::clone(&engine)));
    server.register_action(SEARCH_LOG_CLEAR, LogClearAction::new(Arc::clone(&engine)));
    server.register_action(HEALTH, HealthAction::new(engine));
}

macro_rules! engine_action {
    ($($name:ident),* $(,)?) => {
        $(
            pub struct $name {
                engine: Arc<Engine>,
            }

            impl $name {
                #[inline]
                pub fn new(engine: Arc<Engine>) -> Self {
                    Self { engine }
                }
            }
        )*
    };
}

engine_action!(
    ConversationAction,
    SearchAction,
    AnswerAction,
    IngestAction,
    ListAction,
    LogAppendAction,
    LogEntriesAction,
    LogMigrateAction,
    LogClearAction,
    HealthAction,
);

/// `k` as a positive count: absent or null means "use the default"
fn param_k(request: &ActionRequest, action: &str) -> ActionResult<Option<usize>> {
    match request.parameters.get("k") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|k| usize::try_from(k).ok())
            .map(Some)
            .ok_or_else(|| ActionError::invalid_parameters(action, "k must be a positive integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ActionError::invalid_parameters(action, "k must be a positive integer")),
        Some(_) => Err(ActionError::invalid_parameters(
            action,
            "k must be a positive integer",
        )),
    }
}

/// Typed optional parameter
fn param<T: DeserializeOwned>(
    request: &ActionRequest,
    name: &str,
    action: &str,
) -> ActionResult<Option<T>> {
    match request.parameters.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ActionError::invalid_parameters(action, format!("{}: {}", name, e))),
    }
}

/// Log key: explicit `key`, else the first write scope of the request
fn log_key(request: &ActionRequest) -> String {
    request
        .param_str("key")
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .or_else(|| request.scope_resolver().resolve_write().into_iter().next())
        .unwrap_or_else(|| crate::scope::DEFAULT_NAMESPACE.to_string())
}

async fn run_blocking<T, F>(f: F) -> ActionResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ActionResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ActionError::InternalError {
            message: format!("blocking task failed: {}", e),
        })?
}

#[async_trait]
impl ActionHandler for ConversationAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let message = request.param_str("message").unwrap_or_default();
        let engine = Arc::clone(&self.engine);

        let reply = run_blocking(move || Ok(engine.converse(&message)?)).await?;
        Ok(json!({ "reply": reply }))
    }
}

#[async_trait]
impl ActionHandler for SearchAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let scopes = request.scope_resolver();
        let query = request.param_str("q").unwrap_or_default();
        let k = param_k(request, DOCQA_SEARCH)?;
        debug!("docqa_search over {:?}", scopes.resolve_read());

        let result = self.engine.search_reply(&scopes, &query, k)?;
        Ok(json!({
            "reply": result.reply,
            "citations": result.citations,
            "scopes": scopes.resolve_read(),
        }))
    }
}

#[async_trait]
impl ActionHandler for AnswerAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let scopes = request.scope_resolver();
        let question = request.param_str("q").unwrap_or_default();
        let k = param_k(request, DOCQA_ANSWER)?;

        let mut allow_list: Vec<String> = param(request, "docs", DOCQA_ANSWER)?.unwrap_or_default();
        if let Some(doc) = request
            .param_str("doc")
            .filter(|doc| !doc.is_empty() && !allow_list.contains(doc))
        {
            allow_list.push(doc);
        }
        debug!(
            "docqa_answer over {:?} (allow list: {:?})",
            scopes.resolve_read(),
            allow_list
        );

        let engine = Arc::clone(&self.engine);
        let read_scopes = scopes.resolve_read();
        let answer = run_blocking(move || {
            Ok(engine.answer(&scopes, &question, k, Some(allow_list.as_slice()))?)
        })
        .await?;

        let reply = answer.into_reply();
        Ok(json!({
            "reply": reply.reply,
            "citations": reply.citations,
            "scopes": read_scopes,
        }))
    }
}

#[async_trait]
impl ActionHandler for IngestAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let scopes = request.scope_resolver();
        let name = request.param_str("name");
        let pages: Option<Vec<PageInput>> = param(request, "pages", DOCQA_INGEST)?;
        let text = request.param_str("text");

        let report = match (pages, text) {
            (Some(pages), _) => self.engine.ingest_pages(&scopes, name.as_deref(), pages)?,
            (None, Some(text)) => {
                let slice_size = param(request, "slice_size", DOCQA_INGEST)?;
                self.engine
                    .ingest_text(&scopes, name.as_deref(), &text, slice_size)?
            }
            (None, None) => {
                return Err(ActionError::invalid_parameters(
                    DOCQA_INGEST,
                    "either pages or text is required",
                ));
            }
        };

        Ok(serde_json::to_value(report)?)
    }
}

#[async_trait]
impl ActionHandler for ListAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let scopes = request.scope_resolver();
        let docs = self.engine.list(&scopes);
        Ok(json!({
            "scopes": scopes.resolve_read(),
            "count": docs.len(),
            "docs": docs,
        }))
    }
}

#[async_trait]
impl ActionHandler for LogAppendAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let key = log_key(request);
        let role: Role = param(request, "role", SEARCH_LOG_APPEND)?
            .ok_or_else(|| ActionError::invalid_parameters(SEARCH_LOG_APPEND, "missing role"))?;
        let content = request.param_str("content").unwrap_or_default();
        let citations: Option<Vec<Hit>> = param(request, "citations", SEARCH_LOG_APPEND)?;

        let count = self.engine.log_append(&key, role, &content, citations);
        Ok(json!({ "key": key, "count": count }))
    }
}

#[async_trait]
impl ActionHandler for LogEntriesAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let key = log_key(request);
        let entries = self.engine.log_entries(&key);
        Ok(json!({ "key": key, "entries": entries }))
    }
}

#[async_trait]
impl ActionHandler for LogMigrateAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let scopes = request.scope_resolver();
        let from = match request.param_str("from") {
            Some(from) => from,
            None => scopes.conversation_scope().ok_or_else(|| {
                ActionError::invalid_parameters(
                    SEARCH_LOG_MIGRATE,
                    "missing from (and no conversation id)",
                )
            })?,
        };
        let to = request
            .param_str("to")
            .unwrap_or_else(|| scopes.namespace().to_string());

        let moved = self.engine.log_migrate(&from, &to);
        Ok(json!({ "from": from, "to": to, "moved": moved }))
    }
}

#[async_trait]
impl ActionHandler for LogClearAction {
    #[inline]
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value> {
        let key = log_key(request);
        let cleared = self.engine.log_clear(&key);
        Ok(json!({ "key": key, "cleared": cleared }))
    }
}

#[async_trait]
impl ActionHandler for HealthAction {
    #[inline]
    async fn handle(&self, _request: &ActionRequest) -> ActionResult<Value> {
        Ok(serde_json::to_value(self.engine.health())?)
    }
}
