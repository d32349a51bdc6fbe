//! Counting and failing tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use drover_core::{DroverError, RequestContext, Result, Tool};

/// Tool returning a fixed output, counting its invocations and optionally
/// sleeping first (to scramble completion order in concurrency tests).
pub struct MockTool {
    name: String,
    output: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockTool {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            output: output.into(),
            delay: None,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        })
    }

    /// Like [`Self::new`], but sleeping `delay` before answering.
    pub fn with_delay(
        name: impl Into<String>,
        output: impl Into<String>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            output: output.into(),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every input this tool received, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock tool with a fixed response"
    }

    async fn execute(&self, _ctx: &RequestContext, args: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(args.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.output.clone())
    }
}

/// Tool that always fails with a tool-execution error.
pub struct FailingTool {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            message: message.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock tool that always fails"
    }

    async fn execute(&self, _ctx: &RequestContext, _args: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DroverError::ToolExecution {
            tool: self.name.clone(),
            message: self.message.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_tool_counts_and_records() {
        let tool = MockTool::new("calc", "42");
        let ctx = RequestContext::new();

        assert_eq!(tool.execute(&ctx, "6*7").await.unwrap(), "42");
        assert_eq!(tool.call_count(), 1);
        assert_eq!(tool.inputs(), vec!["6*7".to_string()]);
    }

    #[tokio::test]
    async fn failing_tool_reports_its_name() {
        let tool = FailingTool::new("fragile", "boom");
        let ctx = RequestContext::new();

        let err = tool.execute(&ctx, "x").await.unwrap_err();
        assert_eq!(err.kind(), "TOOL_EXECUTION_ERROR");
        assert!(err.to_string().contains("fragile"));
        assert_eq!(tool.call_count(), 1);
    }
}
