//! MCP client over either transport.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use drover_core::{DroverError, McpServer, McpToolDescriptor, RequestContext, Result};

use crate::http::{HttpServerConfig, HttpTransport};
use crate::jsonrpc::{Request, Response};
use crate::stdio::{StdioServerConfig, StdioTransport};

const PROTOCOL_VERSION: &str = "2024-11-05";

enum Transport {
    Stdio(StdioTransport),
    Http(HttpTransport),
}

/// A connection to an MCP server, over stdio or HTTP.
///
/// Connecting performs the protocol handshake; a stdio child that fails the
/// handshake is killed before the error is returned.
pub struct McpClient {
    transport: Transport,
    label: String,
    next_id: AtomicU64,
}

impl McpClient {
    /// Spawn a child process and connect to it over stdio.
    pub async fn connect_stdio(ctx: &RequestContext, config: StdioServerConfig) -> Result<Self> {
        let label = config.command.clone();
        let client = Self {
            transport: Transport::Stdio(StdioTransport::spawn(&config)?),
            label,
            next_id: AtomicU64::new(1),
        };

        if let Err(err) = client.initialize(ctx).await {
            // Do not leave an orphaned child behind a failed handshake.
            if let Transport::Stdio(transport) = &client.transport {
                let _ = transport.shutdown().await;
            }
            return Err(err);
        }
        Ok(client)
    }

    /// Connect to a hosted MCP server over HTTP.
    pub async fn connect_http(ctx: &RequestContext, config: HttpServerConfig) -> Result<Self> {
        let label = config.endpoint();
        let client = Self {
            transport: Transport::Http(HttpTransport::new(config)?),
            label,
            next_id: AtomicU64::new(1),
        };
        client.initialize(ctx).await?;
        Ok(client)
    }

    /// The command or endpoint this client talks to.
    pub fn label(&self) -> &str {
        &self.label
    }

    async fn call(&self, ctx: &RequestContext, request: &Request) -> Result<Option<Response>> {
        match &self.transport {
            Transport::Stdio(transport) => transport.call(ctx, request).await,
            Transport::Http(transport) => transport.call(ctx, request).await,
        }
    }

    async fn request(&self, ctx: &RequestContext, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(id, method, Some(params));
        let response = self
            .call(ctx, &request)
            .await?
            .ok_or_else(|| DroverError::Transport("expected a response, got none".into()))?;
        response.into_result(DroverError::Transport)
    }
}

#[async_trait]
impl McpServer for McpClient {
    async fn initialize(&self, ctx: &RequestContext) -> Result<()> {
        info!(server = %self.label, "initializing MCP connection");
        self.request(
            ctx,
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "drover-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;

        let note = Request::notification("notifications/initialized", None);
        self.call(ctx, &note).await?;
        Ok(())
    }

    async fn list_tools(&self, ctx: &RequestContext) -> Result<Vec<McpToolDescriptor>> {
        let result = self.request(ctx, "tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DroverError::MalformedResponse("tools/list result carries no tool array".into())
            })?;

        let descriptors = tools
            .iter()
            .filter_map(|tool| {
                let name = tool.get("name")?.as_str()?.to_string();
                let description = tool
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let schema = tool.get("inputSchema").cloned().unwrap_or(json!({}));
                Some(McpToolDescriptor {
                    name,
                    description,
                    schema,
                })
            })
            .collect::<Vec<_>>();

        debug!(server = %self.label, count = descriptors.len(), "discovered MCP tools");
        Ok(descriptors)
    }

    async fn call_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        args: Value,
    ) -> Result<Value> {
        debug!(server = %self.label, tool = %name, "calling MCP tool");
        let result = self
            .request(ctx, "tools/call", json!({ "name": name, "arguments": args }))
            .await
            .map_err(|err| match err {
                DroverError::Transport(message) => DroverError::ToolExecution {
                    tool: name.to_string(),
                    message,
                },
                other => other,
            })?;

        if result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Err(DroverError::ToolExecution {
                tool: name.to_string(),
                message: extract_text(&result),
            });
        }

        Ok(normalize_content(&result))
    }

    async fn close(&self) -> Result<()> {
        info!(server = %self.label, "closing MCP connection");
        match &self.transport {
            Transport::Stdio(transport) => transport.shutdown().await,
            // HTTP connections just drop.
            Transport::Http(_) => Ok(()),
        }
    }
}

/// Join the text blocks of a `tools/call` result.
fn extract_text(result: &Value) -> String {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Normalize a `tools/call` result to a plain value: a single text block
/// becomes its text (parsed as JSON when possible), anything else keeps its
/// block structure.
fn normalize_content(result: &Value) -> Value {
    let Some(blocks) = result.get("content").and_then(Value::as_array) else {
        return result.clone();
    };

    match blocks.len() {
        0 => Value::Null,
        1 => block_to_value(&blocks[0]),
        _ => Value::Array(blocks.iter().map(block_to_value).collect()),
    }
}

fn block_to_value(block: &Value) -> Value {
    match block.get("text").and_then(Value::as_str) {
        Some(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        None => block.clone(),
    }
}
