//! The remote (MCP) tool-server capability.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::Result;

/// A tool advertised by an MCP server: same shape as a local tool descriptor,
/// with the parameter schema kept as the raw JSON schema the server returned.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolDescriptor {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// A connection to an MCP server.
///
/// The connection is a shared resource: an adapter wraps each advertised tool
/// around the same server handle, and the transport serializes in-flight
/// calls as needed.
#[async_trait]
pub trait McpServer: Send + Sync {
    /// Perform the protocol handshake. Implementations must be safe to call
    /// again on an already initialized connection.
    async fn initialize(&self, ctx: &RequestContext) -> Result<()>;

    /// List the tools the server advertises.
    async fn list_tools(&self, ctx: &RequestContext) -> Result<Vec<McpToolDescriptor>>;

    /// Invoke a tool on the server. Error responses from the server surface
    /// as `ToolExecution` errors; the success payload is normalized JSON.
    async fn call_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Tear the connection down: cancel in-flight calls, close the transport,
    /// reap any child process. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;
}
