//! HTTP transport: JSON-RPC over POST.

use reqwest::StatusCode;
use tracing::debug;

use drover_core::{DroverError, RequestContext, Result};

use crate::jsonrpc::{Request, Response};

/// Configuration for an HTTP MCP server.
#[derive(Debug, Clone, Default)]
pub struct HttpServerConfig {
    pub base_url: String,
    pub path: String,
    /// Sent as `Authorization: Bearer <token>` when non-empty.
    pub token: Option<String>,
}

impl HttpServerConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

#[derive(Debug)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    config: HttpServerConfig,
}

impl HttpTransport {
    pub(crate) fn new(config: HttpServerConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(DroverError::Config("MCP server base URL cannot be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    pub(crate) async fn call(
        &self,
        ctx: &RequestContext,
        request: &Request,
    ) -> Result<Option<Response>> {
        ctx.ensure_active()?;

        let mut builder = self.client.post(self.config.endpoint()).json(request);
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.bearer_auth(token);
        }
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }

        debug!(endpoint = %self.config.endpoint(), method = %request.method, "MCP HTTP call");
        let response = builder
            .send()
            .await
            .map_err(|e| DroverError::Transport(format!("MCP HTTP request failed: {e}")))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(DroverError::Auth(format!(
                    "MCP server rejected credentials ({status})"
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(DroverError::RateLimited(format!(
                    "MCP server backpressure ({status})"
                )));
            }
            status if !status.is_success() => {
                return Err(DroverError::Transport(format!(
                    "MCP server returned status {status}"
                )));
            }
            _ => {}
        }

        if request.id.is_none() {
            return Ok(None);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            return Err(DroverError::MalformedResponse(format!(
                "unexpected content type '{content_type}' (expected application/json)"
            )));
        }

        let parsed: Response = response
            .json()
            .await
            .map_err(|e| DroverError::MalformedResponse(format!("invalid JSON-RPC body: {e}")))?;
        Ok(Some(parsed))
    }
}
