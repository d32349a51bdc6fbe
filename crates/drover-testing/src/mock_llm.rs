//! Scripted LLMs and chat providers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use drover_core::{DroverError, GenerateOptions, Llm, RequestContext, Result, Tool};
use drover_llm::{ChatCompletion, ChatProvider, ChatRequest};

/// LLM that answers every prompt with the same text.
pub struct StaticLlm {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl StaticLlm {
    pub fn new(response: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every prompt this mock has seen, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for StaticLlm {
    async fn generate(
        &self,
        _ctx: &RequestContext,
        prompt: &str,
        _opts: &GenerateOptions,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.response.clone())
    }

    async fn generate_with_tools(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        _tools: &[Arc<dyn Tool>],
        opts: &GenerateOptions,
    ) -> Result<String> {
        self.generate(ctx, prompt, opts).await
    }

    fn name(&self) -> &str {
        "static-mock"
    }
}

/// LLM that replays a scripted sequence of responses, one per call.
/// Running past the script is an error so tests notice unexpected calls.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn generate(
        &self,
        _ctx: &RequestContext,
        prompt: &str,
        _opts: &GenerateOptions,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DroverError::MalformedResponse("scripted LLM ran out of responses".into()))
    }

    async fn generate_with_tools(
        &self,
        ctx: &RequestContext,
        prompt: &str,
        _tools: &[Arc<dyn Tool>],
        opts: &GenerateOptions,
    ) -> Result<String> {
        self.generate(ctx, prompt, opts).await
    }

    fn name(&self) -> &str {
        "scripted-mock"
    }
}

/// Chat provider that replays scripted completions and records every
/// request, for driving the full adapter tool-call loop in tests.
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<ChatCompletion>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(completions: impl IntoIterator<Item = ChatCompletion>) -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(completions.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request the adapter sent, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, _ctx: &RequestContext, request: ChatRequest) -> Result<ChatCompletion> {
        self.requests.lock().unwrap().push(request);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                DroverError::MalformedResponse("scripted provider ran out of completions".into())
            })
    }

    fn name(&self) -> &str {
        "scripted-provider"
    }
}
