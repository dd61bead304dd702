use std::collections::HashMap;

use parking_lot::RwLock;

use webrover_core_types::RoverError;

use crate::agent::AgentHandle;

/// Name-keyed lookup of agent instances, populated once at session
/// setup. Agents address each other through here instead of holding
/// direct references, so the dependency graph between agent types stays
/// declared data.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentHandle>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handle: AgentHandle) {
        self.agents.write().insert(name.into(), handle);
    }

    pub fn get(&self, name: &str) -> Option<AgentHandle> {
        self.agents.read().get(name).cloned()
    }

    /// Fail fast when a declared dependency is absent; this catches
    /// configuration mistakes before the crawl starts.
    pub fn require(&self, name: &str) -> Result<AgentHandle, RoverError> {
        self.get(name)
            .ok_or_else(|| RoverError::MissingAgent(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().cloned().collect();
        names.sort();
        names
    }
}
