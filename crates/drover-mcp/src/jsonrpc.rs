//! JSON-RPC 2.0 envelopes used by both MCP transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use drover_core::{DroverError, Result};

pub const JSONRPC_VERSION: &str = "2.0";

/// An outgoing request (or, with `id = None`, a notification).
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// An incoming response.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Response {
    /// Unwrap the result, converting a JSON-RPC error object into the given
    /// error kind.
    pub fn into_result(self, on_error: impl FnOnce(String) -> DroverError) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(on_error(format!("{} (code {})", error.message, error.code)));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}
