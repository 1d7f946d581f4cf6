//! Action server
//!
//! Routes request envelopes to registered handlers and serves them over a
//! line-delimited stream. Every request gets exactly one response line.

use crate::Engine;
use crate::mcp::actions;
use crate::mcp::errors::{ActionError, ActionResult};
use crate::mcp::protocol::{ActionRequest, ActionResponse, RequestId};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

/// Handler for one named action
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, request: &ActionRequest) -> ActionResult<Value>;
}

/// Dispatches action requests to their handlers
pub struct ActionServer {
    engine: Arc<Engine>,
    handlers: HashMap<String, Box<dyn ActionHandler>>,
}

impl ActionServer {
    /// Create a server with every built-in action registered
    #[inline]
    pub fn new(engine: Arc<Engine>) -> Self {
        let mut server = Self {
            engine,
            handlers: HashMap::new(),
        };
        actions::register_defaults(&mut server);
        server
    }

    #[inline]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Register (or replace) the handler for `name`
    #[inline]
    pub fn register_action<H>(&mut self, name: &str, handler: H)
    where
        H: ActionHandler + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
        debug!("Registered action: {}", name);
    }

    /// Names of the registered actions, sorted
    #[inline]
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run one request through its handler
    #[inline]
    pub async fn handle_request(&self, request: ActionRequest) -> ActionResponse {
        let id = request.id.clone().unwrap_or_else(RequestId::generate);

        match self.dispatch(&request).await {
            Ok(data) => ActionResponse::success(id, data),
            Err(e) => {
                e.log();
                e.to_response(id)
            }
        }
    }

    /// Parse one raw line and run it
    #[inline]
    pub async fn handle_line(&self, line: &str) -> ActionResponse {
        match serde_json::from_str::<ActionRequest>(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                let error = ActionError::from(e);
                error.log();
                error.to_response(RequestId::generate())
            }
        }
    }

    async fn dispatch(&self, request: &ActionRequest) -> ActionResult<Value> {
        let action = request
            .action
            .as_deref()
            .ok_or(ActionError::MissingAction)?;

        let handler = self
            .handlers
            .get(action)
            .ok_or_else(|| ActionError::UnknownAction {
                action: action.to_string(),
            })?;

        debug!("Dispatching action: {}", action);
        handler.handle(request).await
    }

    /// Serve requests from `reader` until EOF, writing responses to `writer`
    ///
    /// A line that is not valid UTF-8 gets a parse error response; only EOF
    /// or a read failure ends the loop.
    #[inline]
    pub async fn serve<R, W>(&self, mut reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let response = match std::str::from_utf8(&buf) {
                        Ok(line) => {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            self.handle_line(line).await
                        }
                        Err(e) => {
                            let error = ActionError::ParseError {
                                message: format!("request is not valid UTF-8: {}", e),
                            };
                            error.log();
                            error.to_response(RequestId::generate())
                        }
                    };
                    Self::send_response(writer, &response).await?;
                }
                Err(e) => {
                    error!("Error reading request stream: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Serve over stdin/stdout
    #[inline]
    pub async fn serve_stdio(&self) -> Result<()> {
        info!(
            "Starting action server with stdio transport ({} actions)",
            self.handlers.len()
        );

        let reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(reader, &mut stdout).await?;

        info!("Action server stopped");
        Ok(())
    }

    async fn send_response<W>(writer: &mut W, response: &ActionResponse) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let json = serde_json::to_string(response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
