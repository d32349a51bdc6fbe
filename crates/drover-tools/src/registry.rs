//! In-memory tool registry.

use std::collections::HashMap;
use std::sync::Arc;

use drover_core::Tool;

/// Name-unique mapping of tools.
///
/// The registry preserves registration order for listing while keeping
/// lookups O(1). It is constructed up front and read-only during execution,
/// so it needs no internal locking; share it behind an `Arc` if several
/// components resolve against the same set.
///
/// # Example
///
/// ```rust,ignore
/// let registry = ToolRegistry::new()
///     .with_tool(Arc::new(CalculatorTool))
///     .with_tool(Arc::new(SearchTool));
///
/// let calc = registry.get("calculator").expect("registered");
/// ```
#[derive(Default, Clone)]
pub struct ToolRegistry {
    order: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tools.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool, overwriting in place any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.order[slot] = tool,
            None => {
                self.index.insert(name, self.order.len());
                self.order.push(tool);
            }
        }
    }

    /// Builder-style [`Self::register`].
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Look a tool up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.order[slot].clone())
    }

    /// Snapshot of all tools in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.order.clone()
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drover_core::{RequestContext, Result};

    struct NamedTool {
        name: &'static str,
        output: &'static str,
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn execute(&self, _ctx: &RequestContext, _args: &str) -> Result<String> {
            Ok(self.output.to_string())
        }
    }

    fn tool(name: &'static str, output: &'static str) -> Arc<dyn Tool> {
        Arc::new(NamedTool { name, output })
    }

    #[test]
    fn lookup_and_listing_order() {
        let registry = ToolRegistry::new()
            .with_tool(tool("alpha", "a"))
            .with_tool(tool("beta", "b"));

        assert!(registry.contains("alpha"));
        assert!(registry.get("gamma").is_none());
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn register_overwrites_in_place() {
        let mut registry = ToolRegistry::from_tools([tool("alpha", "old"), tool("beta", "b")]);
        registry.register(tool("alpha", "new"));

        // Same position, new implementation.
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
        let ctx = RequestContext::new();
        let result = registry.get("alpha").unwrap().execute(&ctx, "").await.unwrap();
        assert_eq!(result, "new");
    }

    #[test]
    fn list_is_a_snapshot() {
        let mut registry = ToolRegistry::new().with_tool(tool("alpha", "a"));
        let snapshot = registry.list();
        registry.register(tool("beta", "b"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
