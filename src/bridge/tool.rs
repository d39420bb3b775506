//! The Tool contract and its error taxonomy.
//!
//! A tool is a named handler for one remote operation. Synchronous tools
//! override [`Tool::execute`] and are expected to return quickly without
//! touching host state. Asynchronous tools override [`Tool::execute_async`],
//! schedule their work (typically through the main-thread gate), and resolve
//! the completion sender exactly once -- even on internal failure -- so callers
//! never wait forever.

use serde_json::Value;
use tokio::sync::oneshot;

use super::protocol::Envelope;

/// What a tool execution produces: a result envelope or a structured error.
pub type ToolResult = Result<Envelope, ToolError>;

/// Completion handle passed to async tools. Must be resolved exactly once.
pub type Completion = oneshot::Sender<ToolResult>;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Structured tool failure. `kind()` is the wire-level error type; the
/// Display impl is the human message.
///
/// Convention followed by every tool: missing/malformed request parameter ->
/// [`ToolError::Validation`]; referenced target entity absent ->
/// [`ToolError::NotFound`]; downstream host failure ->
/// [`ToolError::Operation`] with an operation-specific kind such as
/// `creation_error`; anything else -> [`ToolError::Internal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Operation { kind: String, message: String },
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn operation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The `error.type` string sent on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Operation { kind, .. } => kind,
            Self::Internal(_) => "internal_error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tool contract
// ---------------------------------------------------------------------------

/// A named handler unit implementing one remote operation.
///
/// Exactly one of the execute shapes applies, selected by `is_async()`:
/// the default bodies surface an internal error naming the missing override
/// instead of panicking, so a miswired tool still answers its caller.
pub trait Tool: Send + Sync {
    /// Name used in request `method` fields. Unique within a registry.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Selects the dispatch path. Async tools run through `execute_async`.
    fn is_async(&self) -> bool {
        false
    }

    /// Synchronous execution. Must complete quickly and without needing
    /// serialized host access.
    fn execute(&self, params: &Value) -> ToolResult {
        let _ = params;
        Err(ToolError::internal(
            "execute must be overridden when is_async() is false",
        ))
    }

    /// Asynchronous execution: schedule work and resolve `completion` with
    /// the outcome. Implementations are responsible for resolving it exactly
    /// once on every path.
    fn execute_async(&self, params: Value, completion: Completion) {
        let _ = params;
        let _ = completion.send(Err(ToolError::internal(
            "execute_async must be overridden when is_async() is true",
        )));
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// Extract a required string parameter, or a `validation_error` naming it.
pub fn require_str(params: &Value, field: &str) -> Result<String, ToolError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ToolError::validation(format!(
                "Required parameter '{}' is missing or not a string",
                field
            ))
        })
}

/// Extract an optional string parameter.
pub fn optional_str(params: &Value, field: &str) -> Option<String> {
    params.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Extract an optional bool parameter.
pub fn optional_bool(params: &Value, field: &str) -> Option<bool> {
    params.get(field).and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_kinds_match_wire_taxonomy() {
        assert_eq!(ToolError::validation("x").kind(), "validation_error");
        assert_eq!(ToolError::not_found("x").kind(), "not_found");
        assert_eq!(
            ToolError::operation("creation_error", "x").kind(),
            "creation_error"
        );
        assert_eq!(ToolError::internal("x").kind(), "internal_error");
    }

    #[test]
    fn error_display_is_the_message() {
        let err = ToolError::operation("update_error", "could not rename");
        assert_eq!(err.to_string(), "could not rename");
    }

    #[test]
    fn require_str_names_missing_field() {
        let err = require_str(&json!({}), "name").unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn require_str_rejects_non_string() {
        assert!(require_str(&json!({"name": 3}), "name").is_err());
        assert_eq!(
            require_str(&json!({"name": "Cube"}), "name").unwrap(),
            "Cube"
        );
    }

    struct Unimplemented;
    impl Tool for Unimplemented {
        fn name(&self) -> &str {
            "unimplemented"
        }
        fn description(&self) -> &str {
            "no overrides"
        }
    }

    #[test]
    fn default_execute_reports_missing_override() {
        let err = Unimplemented.execute(&json!({})).unwrap_err();
        assert_eq!(err.kind(), "internal_error");
    }

    #[tokio::test]
    async fn default_execute_async_resolves_completion() {
        let (tx, rx) = oneshot::channel();
        Unimplemented.execute_async(json!({}), tx);
        let result = rx.await.unwrap();
        assert_eq!(result.unwrap_err().kind(), "internal_error");
    }
}
