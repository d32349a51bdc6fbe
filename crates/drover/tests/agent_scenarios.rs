//! End-to-end agent scenarios over mock LLMs and tools.

use std::sync::Arc;

use drover::{
    Agent, ChatCompletion, ContentFilter, ConversationBuffer, GuardrailAction, GuardrailPipeline,
    LlmAdapter, Memory, MessageQuery, PlanStatus, RequestContext, Role, ToolCallRequest,
};
use drover_testing::{MockTool, ScriptedLlm, ScriptedProvider, StaticLlm};

fn ctx() -> RequestContext {
    RequestContext::new()
        .with_tenant("acme")
        .with_conversation("conv-1")
}

fn calculator_plan_json(tool: &str) -> String {
    format!(
        r#"{{"description": "Compute the product", "steps": [{{"toolName": "{tool}", "description": "Multiply the numbers", "input": "6*7", "parameters": {{}}}}]}}"#
    )
}

#[tokio::test]
async fn direct_path_without_tools_answers_and_records_memory() {
    let llm = StaticLlm::new("Paris");
    let memory = Arc::new(ConversationBuffer::new());
    let agent = Agent::builder()
        .with_llm(llm.clone())
        .with_memory(memory.clone())
        .with_require_plan_approval(true)
        .build()
        .unwrap();

    let ctx = ctx();
    let answer = agent.run(&ctx, "Capital of France?").await.unwrap();
    assert_eq!(answer, "Paris");

    let messages = memory.messages(&ctx, MessageQuery::all()).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Capital of France?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Paris");
}

#[tokio::test]
async fn plan_path_awaits_approval_then_executes() {
    let llm = ScriptedLlm::new([calculator_plan_json("calculator")]);
    let calculator = MockTool::new("calculator", "42");
    let memory = Arc::new(ConversationBuffer::new());
    let agent = Agent::builder()
        .with_llm(llm)
        .with_tool(calculator.clone())
        .with_memory(memory)
        .build()
        .unwrap();

    let ctx = ctx();

    // First turn: a plan is proposed, not executed.
    let proposal = agent.run(&ctx, "Compute 6*7.").await.unwrap();
    assert!(proposal.contains("execution plan"));
    assert!(proposal.contains("calculator"));
    assert!(proposal.contains("Do you approve this plan?"));
    assert_eq!(calculator.call_count(), 0);

    let plans = agent.plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].status, PlanStatus::AwaitingApproval);
    let task_id = plans[0].task_id.clone();

    // Second turn: approval executes the stored plan.
    let result = agent
        .run(&ctx, &format!("approve plan {task_id}"))
        .await
        .unwrap();
    assert!(result.contains("Step 1"));
    assert!(result.contains("42"));
    assert_eq!(calculator.call_count(), 1);
    assert_eq!(
        agent.plan_by_task_id(&task_id).unwrap().status,
        PlanStatus::Completed
    );
}

#[tokio::test]
async fn plan_referencing_an_unknown_tool_is_rejected_and_not_stored() {
    let llm = ScriptedLlm::new([calculator_plan_json("nonexistent")]);
    let calculator = MockTool::new("calculator", "42");
    let agent = Agent::builder()
        .with_llm(llm)
        .with_tool(calculator)
        .build()
        .unwrap();

    let err = agent.run(&ctx(), "Compute 6*7.").await.unwrap_err();
    assert_eq!(err.kind(), "PLAN_PARSE_ERROR");
    assert!(agent.plans().is_empty());
}

#[tokio::test]
async fn plan_modification_resets_approval_and_keeps_the_id() {
    let llm = ScriptedLlm::new([
        calculator_plan_json("calculator"),
        calculator_plan_json("calculator"),
    ]);
    let agent = Agent::builder()
        .with_llm(llm)
        .with_tool(MockTool::new("calculator", "42"))
        .build()
        .unwrap();

    let ctx = ctx();
    agent.run(&ctx, "Compute 6*7.").await.unwrap();
    let task_id = agent.plans()[0].task_id.clone();

    let response = agent
        .run(&ctx, &format!("modify plan {task_id}: describe the step better"))
        .await
        .unwrap();
    assert!(response.contains("updated the execution plan"));

    let plan = agent.plan_by_task_id(&task_id).unwrap();
    assert_eq!(plan.status, PlanStatus::AwaitingApproval);
    assert!(!plan.user_approved);
}

#[tokio::test]
async fn plan_cancel_and_status_directives() {
    let llm = ScriptedLlm::new([calculator_plan_json("calculator")]);
    let agent = Agent::builder()
        .with_llm(llm)
        .with_tool(MockTool::new("calculator", "42"))
        .build()
        .unwrap();

    let ctx = ctx();
    agent.run(&ctx, "Compute 6*7.").await.unwrap();
    let task_id = agent.plans()[0].task_id.clone();

    let status = agent
        .run(&ctx, &format!("status plan {task_id}"))
        .await
        .unwrap();
    assert!(status.contains("Current plan status: awaiting_approval"));

    let cancelled = agent
        .run(&ctx, &format!("cancel plan {task_id}"))
        .await
        .unwrap();
    assert!(cancelled.contains("Plan cancelled"));
    assert_eq!(
        agent.plan_by_task_id(&task_id).unwrap().status,
        PlanStatus::Cancelled
    );

    // A cancelled plan cannot be approved afterwards.
    let err = agent
        .run(&ctx, &format!("approve plan {task_id}"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ILLEGAL_STATE");
}

#[tokio::test]
async fn parallel_tool_batch_joins_results_in_call_order() {
    use std::time::Duration;

    let tools: Vec<Arc<dyn drover::Tool>> = vec![
        MockTool::with_delay("tool_a", "a", Duration::from_millis(30)),
        MockTool::with_delay("tool_b", "b", Duration::from_millis(10)),
        MockTool::with_delay("tool_c", "c", Duration::from_millis(20)),
    ];
    let wrapper_args = serde_json::json!({
        "tool_uses": [
            { "recipient_name": "tool_a", "parameters": {} },
            { "recipient_name": "tool_b", "parameters": {} },
            { "recipient_name": "tool_c", "parameters": {} },
        ]
    })
    .to_string();

    let provider = ScriptedProvider::new([
        ChatCompletion::with_tool_calls(vec![ToolCallRequest {
            id: "call-1".into(),
            name: "parallel_tool_use".into(),
            arguments: wrapper_args,
        }]),
        ChatCompletion::text("all done"),
    ]);
    let adapter = LlmAdapter::new(provider.clone());

    let agent = Agent::builder()
        .with_llm(Arc::new(adapter))
        .with_tools(tools)
        .with_require_plan_approval(false)
        .build()
        .unwrap();

    let answer = agent.run(&ctx(), "run everything").await.unwrap();
    assert_eq!(answer, "all done");

    // The tool results fed back to the provider follow call order, not
    // completion order.
    let requests = provider.requests();
    let tool_message = requests[1]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert_eq!(tool_message.content, "a\nb\nc");
}

#[tokio::test]
async fn guardrail_block_stops_the_turn_before_the_llm() {
    let llm = StaticLlm::new("should never be produced");
    let memory = Arc::new(ConversationBuffer::new());
    let guardrails = GuardrailPipeline::new().with_rail(Arc::new(
        ContentFilter::new(vec!["forbidden".into()], GuardrailAction::Block).unwrap(),
    ));
    let agent = Agent::builder()
        .with_llm(llm.clone())
        .with_memory(memory.clone())
        .with_guardrails(guardrails)
        .build()
        .unwrap();

    let ctx = ctx();
    let err = agent
        .run(&ctx, "say the forbidden word")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "GUARDRAIL_BLOCKED");
    assert_eq!(llm.call_count(), 0);

    // The user message was already appended; no assistant message follows.
    let messages = memory.messages(&ctx, MessageQuery::all()).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn output_guardrails_redact_the_response() {
    let llm = StaticLlm::new("reach me at agent@example.com");
    let guardrails = GuardrailPipeline::new()
        .with_rail(Arc::new(drover::PiiFilter::new(GuardrailAction::Redact)));
    let agent = Agent::builder()
        .with_llm(llm)
        .with_guardrails(guardrails)
        .build()
        .unwrap();

    let answer = agent.run(&ctx(), "how do I contact you?").await.unwrap();
    assert_eq!(answer, "reach me at [REDACTED email]");
}
