//! End-to-end multi-agent workflow scenarios.

use std::sync::Arc;

use drover::{Agent, AgentRegistry, Orchestrator, RequestContext, TaskStatus, Workflow};
use drover_testing::{ScriptedLlm, StaticLlm};

fn ctx() -> RequestContext {
    RequestContext::new()
        .with_tenant("acme")
        .with_conversation("workflow-1")
}

/// A plain direct-path agent that always answers `response`.
fn answering_agent(name: &str, response: &str) -> Arc<Agent> {
    Arc::new(
        Agent::builder()
            .with_llm(StaticLlm::new(response))
            .with_name(name)
            .build()
            .unwrap(),
    )
}

/// An agent whose LLM always errors (empty script).
fn failing_agent(name: &str) -> Arc<Agent> {
    Arc::new(
        Agent::builder()
            .with_llm(ScriptedLlm::new(Vec::<String>::new()))
            .with_name(name)
            .build()
            .unwrap(),
    )
}

/// T1 -> T2, T1 -> T3, T3 -> T4 with T3 failing. Completed work is kept,
/// the dependent of the failure never runs, and the declared final task
/// decides the workflow's answer.
#[tokio::test]
async fn partial_failure_keeps_completed_branches() {
    let mut registry = AgentRegistry::new();
    registry.register(answering_agent("starter", "started"));
    registry.register(answering_agent("left", "left done"));
    registry.register(failing_agent("broken"));
    registry.register(answering_agent("tail", "never used"));
    let orchestrator = Orchestrator::new(registry);

    let mut workflow = Workflow::new();
    workflow.add_task("t1", "starter", "kick off", vec![]).unwrap();
    workflow
        .add_task("t2", "left", "left branch", vec!["t1".into()])
        .unwrap();
    workflow
        .add_task("t3", "broken", "right branch", vec!["t1".into()])
        .unwrap();
    workflow
        .add_task("t4", "tail", "after right", vec!["t3".into()])
        .unwrap();
    workflow.set_final_task("t2");

    let result = orchestrator.execute(&ctx(), &mut workflow).await.unwrap();
    assert_eq!(result, "left done");

    assert_eq!(workflow.task("t1").unwrap().status, TaskStatus::Completed);
    assert_eq!(workflow.task("t2").unwrap().status, TaskStatus::Completed);
    assert_eq!(workflow.task("t3").unwrap().status, TaskStatus::Failed);
    assert_eq!(workflow.task("t4").unwrap().status, TaskStatus::Pending);
    assert!(workflow.errors.contains_key("t3"));
    assert!(!workflow.errors.contains_key("t4"));
}

/// Same graph, but the failing task is the final one: its error is the
/// workflow's outcome.
#[tokio::test]
async fn failing_final_task_is_the_workflow_error() {
    let mut registry = AgentRegistry::new();
    registry.register(answering_agent("starter", "started"));
    registry.register(answering_agent("left", "left done"));
    registry.register(failing_agent("broken"));
    let orchestrator = Orchestrator::new(registry);

    let mut workflow = Workflow::new();
    workflow.add_task("t1", "starter", "kick off", vec![]).unwrap();
    workflow
        .add_task("t2", "left", "left branch", vec!["t1".into()])
        .unwrap();
    workflow
        .add_task("t3", "broken", "right branch", vec!["t1".into()])
        .unwrap();
    workflow.set_final_task("t3");

    let err = orchestrator.execute(&ctx(), &mut workflow).await.unwrap_err();
    assert_eq!(err.kind(), "TASK_FAILED");
    assert_eq!(workflow.task("t2").unwrap().status, TaskStatus::Completed);
}

/// Dependency results are injected into downstream prompts.
#[tokio::test]
async fn downstream_agents_see_upstream_results() {
    let collector = StaticLlm::new("summary");
    let summarizer = Arc::new(
        Agent::builder()
            .with_llm(collector.clone())
            .with_name("summarizer")
            .build()
            .unwrap(),
    );

    let mut registry = AgentRegistry::new();
    registry.register(answering_agent("researcher", "research notes"));
    registry.register(summarizer);
    let orchestrator = Orchestrator::new(registry);

    let mut workflow = Workflow::new();
    workflow
        .add_task("research", "researcher", "find facts", vec![])
        .unwrap();
    workflow
        .add_task("summary", "summarizer", "summarize", vec!["research".into()])
        .unwrap();
    workflow.set_final_task("summary");

    let result = orchestrator.execute(&ctx(), &mut workflow).await.unwrap();
    assert_eq!(result, "summary");

    let prompt = &collector.prompts()[0];
    assert!(prompt.contains("summarize"));
    assert!(prompt.contains("Result from research: research notes"));
}

/// Independent tasks run concurrently and all complete.
#[tokio::test]
async fn fan_out_workflow_completes_every_task() {
    let mut registry = AgentRegistry::new();
    registry.register(answering_agent("worker", "done"));
    let orchestrator = Orchestrator::new(registry);

    let mut workflow = Workflow::new();
    for i in 0..6 {
        workflow
            .add_task(format!("job-{i}"), "worker", format!("work {i}"), vec![])
            .unwrap();
    }
    workflow.set_final_task("job-0");

    let result = orchestrator.execute(&ctx(), &mut workflow).await.unwrap();
    assert_eq!(result, "done");
    assert!(workflow
        .tasks
        .iter()
        .all(|t| t.status == TaskStatus::Completed));
    assert_eq!(workflow.results.len(), 6);
}
