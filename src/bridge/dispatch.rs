//! Per-frame request dispatcher.
//!
//! State machine per inbound frame: decode -> resolve (builtin | registry |
//! unknown) -> execute (sync, or async awaiting the tool's completion) ->
//! exactly one correlated response. Failures at any stage become error
//! responses; nothing escapes to terminate the connection's processing loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::protocol::{self, Request, Response};
use super::registry::ToolRegistry;
use super::tool::{ToolError, ToolResult};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    /// Bounded wait for async tool completions. `None` preserves the
    /// original contract of waiting indefinitely.
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            request_timeout: None,
        }
    }

    /// Enable a bounded wait on async tool completions. An unresolved
    /// completion then yields a `timeout_error` response instead of leaving
    /// the client waiting forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Process one raw text frame into exactly one response.
    pub async fn dispatch_frame(&self, frame: &str) -> Response {
        let request = protocol::decode(frame);
        if request.is_parse_failure() {
            return Response::error(
                request.id,
                "unknown_method",
                "Malformed request frame: expected a JSON object with id/method/params",
            );
        }
        self.dispatch(request).await
    }

    /// Process an already-decoded request.
    pub async fn dispatch(&self, request: Request) -> Response {
        debug!("[Dispatch] Processing method: {}", request.method);

        // Liveness builtins answer directly without touching the registry.
        if matches!(request.method.as_str(), "ping" | "test") {
            return Response::success(
                request.id,
                json!({
                    "success": true,
                    "message": "Scene bridge is alive",
                    "timestamp": chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                    "tools_count": self.registry.len(),
                }),
            );
        }

        let Some(tool) = self.registry.resolve(&request.method) else {
            return Response::error(
                request.id,
                "unknown_method",
                format!("Unknown method: {}", request.method),
            );
        };

        let result = if tool.is_async() {
            self.run_async_tool(&request, tool.as_ref()).await
        } else {
            run_sync_tool(&request, tool.as_ref())
        };

        match result {
            Ok(envelope) => Response::success(request.id, envelope.into_value()),
            Err(e) => {
                warn!("[Dispatch] Tool '{}' failed: {}", request.method, e);
                Response::error(request.id, e.kind(), e.to_string())
            }
        }
    }

    async fn run_async_tool(&self, request: &Request, tool: &dyn super::tool::Tool) -> ToolResult {
        let (tx, rx) = oneshot::channel();
        let params = request.params.clone();
        let scheduled = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tool.execute_async(params, tx)
        }));
        if scheduled.is_err() {
            return Err(ToolError::internal(format!(
                "Tool '{}' panicked while scheduling",
                request.method
            )));
        }

        let completion = match self.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(completion) => completion,
                Err(_) => {
                    return Err(ToolError::operation(
                        "timeout_error",
                        format!(
                            "Tool '{}' did not complete within {}s",
                            request.method,
                            timeout.as_secs()
                        ),
                    ))
                }
            },
            None => rx.await,
        };

        // A dropped completion means the tool broke its contract; answer the
        // client instead of hanging it.
        completion.unwrap_or_else(|_| {
            Err(ToolError::internal(format!(
                "Tool '{}' dropped its completion without resolving it",
                request.method
            )))
        })
    }
}

fn run_sync_tool(request: &Request, tool: &dyn super::tool::Tool) -> ToolResult {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        tool.execute(&request.params)
    }));
    outcome.unwrap_or_else(|_| {
        Err(ToolError::internal(format!(
            "Tool '{}' panicked during execution",
            request.method
        )))
    })
}
