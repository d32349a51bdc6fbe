//! Agent registry for workflow dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use drover_core::Agent;

/// Registered agents, keyed by the id workflow tasks refer to.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own name.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    /// Register an agent under an explicit id.
    pub fn register_as(&mut self, id: impl Into<String>, agent: Arc<dyn Agent>) {
        self.agents.insert(id.into(), agent);
    }

    /// Builder-style [`Self::register`].
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.ids())
            .finish()
    }
}
