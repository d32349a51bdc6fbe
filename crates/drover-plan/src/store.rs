//! Process-local plan storage.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::plan::ExecutionPlan;

/// Keyed storage `task_id → plan` guarded by a readers/writer lock:
/// concurrent reads, exclusive writes. Plans are stored by value; updating
/// a plan means storing it again under the same task id. Nothing survives a
/// process restart.
#[derive(Debug, Default)]
pub struct PlanStore {
    plans: RwLock<HashMap<String, ExecutionPlan>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the plan under its task id.
    pub fn store(&self, plan: ExecutionPlan) {
        let mut plans = self.plans.write().expect("plan store lock poisoned");
        plans.insert(plan.task_id.clone(), plan);
    }

    /// Fetch a plan by task id.
    pub fn get_by_task_id(&self, task_id: &str) -> Option<ExecutionPlan> {
        let plans = self.plans.read().expect("plan store lock poisoned");
        plans.get(task_id).cloned()
    }

    /// Snapshot of all stored plans.
    pub fn list(&self) -> Vec<ExecutionPlan> {
        let plans = self.plans.read().expect("plan store lock poisoned");
        plans.values().cloned().collect()
    }

    /// Remove a plan; returns whether it existed.
    pub fn delete(&self, task_id: &str) -> bool {
        let mut plans = self.plans.write().expect("plan store lock poisoned");
        plans.remove(task_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.plans.read().expect("plan store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanStatus, PlanStep};
    use serde_json::Map;

    fn plan(description: &str) -> ExecutionPlan {
        ExecutionPlan::new(
            description,
            vec![PlanStep {
                tool_name: "calc".into(),
                description: "compute".into(),
                input: "1".into(),
                parameters: Map::new(),
            }],
        )
    }

    #[test]
    fn store_get_delete_round_trip() {
        let store = PlanStore::new();
        let p = plan("first");
        let id = p.task_id.clone();

        store.store(p);
        assert!(store.get_by_task_id(&id).is_some());
        assert!(store.get_by_task_id("missing").is_none());

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.is_empty());
    }

    #[test]
    fn storing_again_replaces_the_plan() {
        let store = PlanStore::new();
        let mut p = plan("original");
        let id = p.task_id.clone();
        store.store(p.clone());

        p.transition(PlanStatus::AwaitingApproval).unwrap();
        store.store(p);

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_by_task_id(&id).unwrap().status,
            PlanStatus::AwaitingApproval
        );
    }

    #[test]
    fn list_returns_a_snapshot() {
        let store = PlanStore::new();
        store.store(plan("one"));
        store.store(plan("two"));

        let snapshot = store.list();
        store.store(plan("three"));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.len(), 3);
    }
}
