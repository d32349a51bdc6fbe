//! Provider adapter: options handling, retries, and the tool-call loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use drover_core::{
    DroverError, GenerateOptions, Llm, RequestContext, Result, Tool,
};
use drover_tools::json_schema;

use crate::provider::{ChatCompletion, ChatMessage, ChatProvider, ChatRequest, ToolCallRequest};
use crate::retry::RetryPolicy;

/// Synthetic tool name some providers use to batch several calls into one.
const PARALLEL_TOOL_NAME: &str = "parallel_tool_use";

/// Alias emitted by OpenAI-compatible providers for the same wrapper. The
/// dot makes it an invalid function name to send back, so it is rewritten to
/// [`PARALLEL_TOOL_NAME`] before results are linked.
const PARALLEL_TOOL_ALIAS: &str = "multi_tool_use.parallel";

/// Upper bound on provider round trips in one `generate_with_tools` turn;
/// past it the final request is made without tools so the turn terminates.
const MAX_TOOL_ROUNDS: usize = 8;

/// Adapter turning any [`ChatProvider`] into a full [`Llm`].
///
/// The adapter owns everything providers share: reasoning-mode rewriting of
/// the system message, retrying transient failures, converting registered
/// tools into schemas, and driving the tool-call loop — including fanning a
/// batched parallel call out across concurrent workers and re-serializing
/// the results in call order.
pub struct LlmAdapter {
    provider: Arc<dyn ChatProvider>,
    retry: Option<RetryPolicy>,
}

impl LlmAdapter {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            retry: None,
        }
    }

    /// Retry transient provider failures under the given policy.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    fn base_messages(&self, prompt: &str, opts: &GenerateOptions) -> Vec<ChatMessage> {
        let mut messages = Vec::new();
        if let Some(system) = opts.effective_system_message() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    fn request(
        &self,
        ctx: &RequestContext,
        messages: Vec<ChatMessage>,
        tool_schemas: Vec<serde_json::Value>,
        opts: &GenerateOptions,
    ) -> ChatRequest {
        ChatRequest {
            messages,
            tool_schemas,
            config: opts.config.clone(),
            response_format: opts.response_format.clone(),
            // Documented "default" fallback: the hint only attributes usage,
            // so a missing tenant must not fail the call.
            tenant_hint: opts
                .tenant_hint
                .clone()
                .or_else(|| Some(ctx.tenant_or_default().to_string())),
        }
    }

    async fn chat(&self, ctx: &RequestContext, request: ChatRequest) -> Result<ChatCompletion> {
        match &self.retry {
            Some(policy) => {
                policy
                    .run(ctx, || self.provider.chat(ctx, request.clone()))
                    .await
            }
            None => {
                ctx.ensure_active()?;
                self.provider.chat(ctx, request).await
            }
        }
    }

    /// Execute one batch of model-requested tool calls, appending the
    /// resulting `tool` messages to `messages`.
    async fn execute_tool_calls(
        &self,
        ctx: &RequestContext,
        tools: &[Arc<dyn Tool>],
        tool_calls: &[ToolCallRequest],
        messages: &mut Vec<ChatMessage>,
    ) -> Result<()> {
        for call in tool_calls {
            if call.name == PARALLEL_TOOL_NAME {
                let joined = self.execute_parallel(ctx, tools, &call.arguments).await?;
                messages.push(ChatMessage::tool_result(
                    call.id.clone(),
                    PARALLEL_TOOL_NAME,
                    joined,
                ));
                continue;
            }

            let Some(tool) = find_tool(tools, &call.name) else {
                warn!(tool = %call.name, "model requested a tool that is not available");
                return Err(DroverError::UnknownTool(call.name.clone()));
            };

            info!(tool = %tool.name(), "executing tool call");
            match tool.execute(ctx, &call.arguments).await {
                Ok(result) => {
                    messages.push(ChatMessage::tool_result(
                        call.id.clone(),
                        tool.name().to_string(),
                        result,
                    ));
                }
                Err(err) => {
                    // A failed individual call is reported back to the model
                    // as a tool message; the turn itself continues.
                    warn!(tool = %tool.name(), error = %err, "tool call failed");
                    messages.push(ChatMessage::tool_result(
                        call.id.clone(),
                        tool.name().to_string(),
                        format!("Error: {err}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Fan a batched parallel call out over concurrent workers and join the
    /// results in the original sub-call order.
    async fn execute_parallel(
        &self,
        ctx: &RequestContext,
        tools: &[Arc<dyn Tool>],
        arguments: &str,
    ) -> Result<String> {
        let wrapper: ParallelWrapper = serde_json::from_str(arguments).map_err(|e| {
            DroverError::MalformedResponse(format!("invalid parallel tool-call payload: {e}"))
        })?;

        let count = wrapper.tool_uses.len();
        if count == 0 {
            return Ok(String::new());
        }

        info!(count, "executing parallel tool calls");
        let (tx, mut rx) = mpsc::channel::<(usize, Result<String>)>(count);

        for (index, tool_use) in wrapper.tool_uses.into_iter().enumerate() {
            let tx = tx.clone();
            let ctx = ctx.child();
            let tool = find_tool(tools, &tool_use.recipient_name);
            let name = tool_use.recipient_name;
            let args = tool_use.parameters.to_string();

            tokio::spawn(async move {
                let outcome = match tool {
                    Some(tool) => tool.execute(&ctx, &args).await,
                    None => Err(DroverError::UnknownTool(name)),
                };
                // The channel is buffered by the batch size, so this send
                // never blocks; a dropped receiver just discards the result.
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        // Join by inbound index: slots keep call order regardless of the
        // order workers finish in.
        let mut slots: Vec<Option<String>> = vec![None; count];
        while let Some((index, outcome)) = rx.recv().await {
            match outcome {
                Ok(result) => slots[index] = Some(result),
                // First observed worker error aborts the turn; results from
                // the remaining workers are discarded with the receiver.
                Err(err) => return Err(err),
            }
        }

        let results: Vec<String> = slots.into_iter().map(Option::unwrap_or_default).collect();
        Ok(results.join("\n"))
    }
}

#[async_trait]
impl Llm for LlmAdapter {
    async fn generate(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<String> {
        let request = self.request(ctx, self.base_messages(prompt, opts), Vec::new(), opts);
        let completion = self.chat(ctx, request).await?;
        Ok(completion.content.trim().to_string())
    }

    async fn generate_with_tools(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
        opts: &GenerateOptions,
    ) -> Result<String> {
        let schemas: Vec<serde_json::Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": json_schema(tool.as_ref()),
                })
            })
            .collect();

        let mut messages = self.base_messages(prompt, opts);
        let mut round = 0;

        loop {
            ctx.ensure_active()?;
            round += 1;

            // Tools are withheld on the final bounded round so the provider
            // must answer in text.
            let schemas_for_round = if round > MAX_TOOL_ROUNDS {
                Vec::new()
            } else {
                schemas.clone()
            };
            let request = self.request(ctx, messages.clone(), schemas_for_round, opts);
            let mut completion = self.chat(ctx, request).await?;

            if completion.tool_calls.is_empty() {
                return Ok(completion.content.trim().to_string());
            }

            for call in &mut completion.tool_calls {
                if call.name == PARALLEL_TOOL_ALIAS {
                    debug!("rewriting provider parallel wrapper alias");
                    call.name = PARALLEL_TOOL_NAME.to_string();
                }
            }

            debug!(count = completion.tool_calls.len(), round, "processing tool calls");
            messages.push(ChatMessage::assistant_with_calls(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));
            self.execute_tool_calls(ctx, tools, &completion.tool_calls, &mut messages)
                .await?;
        }
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

fn find_tool(tools: &[Arc<dyn Tool>], name: &str) -> Option<Arc<dyn Tool>> {
    tools.iter().find(|t| t.name() == name).cloned()
}

/// Payload of a batched parallel call.
#[derive(Debug, Deserialize)]
struct ParallelWrapper {
    tool_uses: Vec<ParallelToolUse>,
}

#[derive(Debug, Deserialize)]
struct ParallelToolUse {
    recipient_name: String,
    parameters: serde_json::Value,
}
