//! Remote tools adapted to the local tool contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use drover_core::{McpServer, McpToolDescriptor, ParameterSpec, RequestContext, Result, Tool};
use drover_tools::parameters_from_schema;

/// A tool advertised by an MCP server, exposed through the local [`Tool`]
/// trait so registries, planners and the LLM adapter treat it uniformly
/// with local tools. The server connection is shared between all tools of
/// one server.
pub struct RemoteTool {
    descriptor: McpToolDescriptor,
    server: Arc<dyn McpServer>,
}

impl RemoteTool {
    pub fn new(descriptor: McpToolDescriptor, server: Arc<dyn McpServer>) -> Self {
        Self { descriptor, server }
    }

    /// Wrap every tool a server advertises.
    pub async fn discover(
        ctx: &RequestContext,
        server: Arc<dyn McpServer>,
    ) -> Result<Vec<Arc<dyn Tool>>> {
        let descriptors = server.list_tools(ctx).await?;
        Ok(descriptors
            .into_iter()
            .map(|descriptor| {
                Arc::new(RemoteTool::new(descriptor, server.clone())) as Arc<dyn Tool>
            })
            .collect())
    }

    /// The raw JSON schema the server advertised.
    pub fn schema(&self) -> &Value {
        &self.descriptor.schema
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters(&self) -> BTreeMap<String, ParameterSpec> {
        parameters_from_schema(&self.descriptor.schema)
    }

    async fn execute(&self, ctx: &RequestContext, args: &str) -> Result<String> {
        // Tool-call arguments arrive as a JSON object; free-form input is
        // wrapped so the remote side still receives an object.
        let parsed: Value = match serde_json::from_str(args) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => serde_json::json!({ "input": other }),
            Err(_) => {
                warn!(tool = %self.descriptor.name, "input is not JSON, wrapping in an object");
                serde_json::json!({ "input": args })
            }
        };

        let response = self
            .server
            .call_tool(ctx, &self.descriptor.name, parsed)
            .await?;

        Ok(match response {
            Value::String(text) => text,
            other => serde_json::to_string(&other)?,
        })
    }
}
