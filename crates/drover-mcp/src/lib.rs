//! # Drover MCP
//!
//! Remote tools over the Model Context Protocol: a stdio transport that
//! spawns and talks JSON-RPC to a child process, an HTTP transport for
//! hosted servers, and the [`RemoteTool`] adapter that makes the tools a
//! server advertises indistinguishable from local ones.

pub mod client;
pub mod http;
pub mod jsonrpc;
pub mod stdio;
pub mod tool;

pub use client::McpClient;
pub use http::HttpServerConfig;
pub use stdio::StdioServerConfig;
pub use tool::RemoteTool;
