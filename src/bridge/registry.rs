//! Name -> tool lookup table, built once at server startup.
//!
//! Registration is single-threaded during initialization; after that the
//! registry is shared behind an `Arc` and only read, so dispatch-time
//! lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::tool::Tool;

/// Immutable metadata describing one registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub is_async: bool,
}

/// Holds the registered tools, keyed by method name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its name. A duplicate name overwrites the
    /// previous entry (last write wins); the replacement is logged.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if name.is_empty() {
            warn!("[Registry] Refusing to register a tool with an empty name");
            return;
        }
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("[Registry] Tool '{}' re-registered, replacing previous entry", name);
        } else {
            info!("[Registry] Registered tool: {}", name);
        }
    }

    /// Resolve a method name to its handler.
    pub fn resolve(&self, method: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(method).cloned()
    }

    /// Descriptors for every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut out: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                is_async: t.is_async(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::Envelope;
    use crate::bridge::tool::ToolResult;
    use serde_json::Value;

    struct Named {
        name: &'static str,
        description: &'static str,
    }

    impl Tool for Named {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            self.description
        }
        fn execute(&self, _params: &Value) -> ToolResult {
            Ok(Envelope::ok(self.description))
        }
    }

    #[test]
    fn resolve_finds_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named {
            name: "scene.noop",
            description: "does nothing",
        }));
        assert!(registry.resolve("scene.noop").is_some());
        assert!(registry.resolve("scene.missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_last_write_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named {
            name: "scene.noop",
            description: "first",
        }));
        registry.register(Arc::new(Named {
            name: "scene.noop",
            description: "second",
        }));
        assert_eq!(registry.len(), 1);
        let tool = registry.resolve("scene.noop").unwrap();
        assert_eq!(tool.description(), "second");
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named {
            name: "",
            description: "nameless",
        }));
        assert!(registry.is_empty());
    }

    #[test]
    fn descriptors_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named {
            name: "b.tool",
            description: "b",
        }));
        registry.register(Arc::new(Named {
            name: "a.tool",
            description: "a",
        }));
        let descriptors = registry.descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.tool", "b.tool"]);
    }
}
