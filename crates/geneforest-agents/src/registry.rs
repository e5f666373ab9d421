//! Explicit agent registry.
//!
//! Several instances of the same agent may coexist (two analysis runs can
//! each load their own `biomart_agent`), so a name resolves to a list and
//! every registration gets a unique codename for disambiguation. The
//! registry is a plain value passed by reference to whoever dispatches by
//! name — never a process-wide global.

use dashmap::DashMap;
use uuid::Uuid;

use geneforest_core::DynAgentExecutor;

/// One registered agent instance.
#[derive(Clone)]
pub struct RegisteredAgent {
    pub codename: String,
    pub executor: DynAgentExecutor,
}

#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Vec<RegisteredAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
        }
    }

    /// Register an agent instance under its own name; returns the generated
    /// codename.
    pub fn register(&self, executor: DynAgentExecutor) -> String {
        let name = executor.name().to_string();
        let codename = format!("{name}-{}", &Uuid::new_v4().simple().to_string()[..8]);
        self.agents.entry(name).or_default().push(RegisteredAgent {
            codename: codename.clone(),
            executor,
        });
        codename
    }

    /// All instances registered under `name`, in registration order.
    pub fn agents_by_name(&self, name: &str) -> Vec<RegisteredAgent> {
        self.agents
            .get(name)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Disambiguation keys for every instance registered under `name`.
    pub fn codenames_by_name(&self, name: &str) -> Vec<String> {
        self.agents_by_name(name)
            .into_iter()
            .map(|agent| agent.codename)
            .collect()
    }

    /// Resolve exactly one instance by its codename.
    pub fn agent_by_codename(&self, codename: &str) -> Option<RegisteredAgent> {
        self.agents.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|agent| agent.codename == codename)
                .cloned()
        })
    }

    /// All registered agent names.
    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use geneforest_core::StubExecutor;

    fn stub(name: &str) -> DynAgentExecutor {
        Arc::new(StubExecutor::new(name))
    }

    #[test]
    fn duplicate_names_resolve_to_all_instances() {
        let registry = AgentRegistry::new();
        let first = registry.register(stub("biomart_agent"));
        let second = registry.register(stub("biomart_agent"));

        let matches = registry.agents_by_name("biomart_agent");
        assert_eq!(matches.len(), 2);
        assert_ne!(first, second);
        assert_eq!(registry.codenames_by_name("biomart_agent"), vec![first, second]);
    }

    #[test]
    fn codename_resolves_exactly_one_instance() {
        let registry = AgentRegistry::new();
        registry.register(stub("literature_agent"));
        let codename = registry.register(stub("literature_agent"));

        let agent = registry.agent_by_codename(&codename).expect("codename hit");
        assert_eq!(agent.codename, codename);
        assert!(registry.agent_by_codename("literature_agent-00000000").is_none());
    }

    #[test]
    fn unknown_name_yields_empty_list() {
        let registry = AgentRegistry::new();
        assert!(registry.agents_by_name("missing_agent").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn len_counts_instances_not_names() {
        let registry = AgentRegistry::new();
        registry.register(stub("google_agent"));
        registry.register(stub("google_agent"));
        registry.register(stub("structure_agent"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names().len(), 2);
    }
}
