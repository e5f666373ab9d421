use tracing::{debug, warn};

use geneforest_core::ResultCache;

use crate::registry::AgentRegistry;

/// Call a named expert agent and persist the exchange to the result cache.
///
/// This is the function the orchestrator's framework exposes as its
/// delegation tool, so every failure mode comes back as plain text the
/// calling agent can read — lookup misses and runtime errors are answers,
/// not panics. A cache write failure only costs the cache entry; the
/// response still flows back to the orchestrator.
pub async fn call_expert_agent(
    registry: &AgentRegistry,
    cache: Option<&ResultCache>,
    agent_name: &str,
    user_query: &str,
    agent_codename: Option<&str>,
    call_the_first_instance: bool,
) -> String {
    let agents = registry.agents_by_name(agent_name);
    let Some(first) = agents.first() else {
        return format!("Agent with name {agent_name} not found");
    };

    let mut selected = first.clone();
    if agents.len() > 1 && !call_the_first_instance {
        let codenames = registry.codenames_by_name(agent_name);
        debug!(
            agent = agent_name,
            ?codenames,
            requested_codename = ?agent_codename,
            "multiple agent instances found"
        );

        let Some(codename) = agent_codename else {
            return format!(
                "Multiple agents with name {agent_name} found, codenames: {codenames:?}"
            );
        };

        // The codename must belong to the requested name; a stray codename
        // from another agent must not silently reroute the call.
        match registry.agent_by_codename(codename) {
            Some(agent) if codenames.iter().any(|c| c == codename) => selected = agent,
            _ => {
                return format!(
                    "Agent with codename {codename} not found, existing codenames: {codenames:?}"
                );
            }
        }
    }

    let response = match selected.executor.query(user_query).await {
        Ok(response) => response,
        Err(err) => return format!("Agent {agent_name} failed: {err}"),
    };

    if let Some(cache) = cache {
        if let Err(err) = cache.write(agent_name, user_query, &response) {
            warn!(
                agent = agent_name,
                error = %err,
                "failed to cache agent result; continuing uncached"
            );
        }
    }

    format!("Agent {agent_name} response: {response}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use geneforest_core::{ResultCache, StubExecutor};
    use tempfile::TempDir;

    fn registry_with(names: &[&str]) -> AgentRegistry {
        let registry = AgentRegistry::new();
        for name in names {
            registry.register(Arc::new(
                StubExecutor::new(*name).with_fallback(format!("{name} answer")),
            ));
        }
        registry
    }

    #[tokio::test]
    async fn delegation_persists_the_exchange_to_the_cache() {
        let temp = TempDir::new().expect("temp dir");
        let cache = ResultCache::new(temp.path());
        let registry = registry_with(&["biomart_agent"]);

        let response = call_expert_agent(
            &registry,
            Some(&cache),
            "biomart_agent",
            "TP53 orthologs?",
            None,
            true,
        )
        .await;

        assert!(response.starts_with("Agent biomart_agent response:"));
        let hits = cache.search("TP53");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query, "TP53 orthologs?");
        assert_eq!(hits[0].result, "biomart_agent answer");
    }

    #[tokio::test]
    async fn unknown_agent_is_reported_as_text() {
        let registry = registry_with(&["google_agent"]);
        let response =
            call_expert_agent(&registry, None, "missing_agent", "anything", None, true).await;
        assert_eq!(response, "Agent with name missing_agent not found");
    }

    #[tokio::test]
    async fn ambiguous_name_requires_a_codename() {
        let registry = registry_with(&["literature_agent", "literature_agent"]);

        let response = call_expert_agent(
            &registry,
            None,
            "literature_agent",
            "FOXO3 papers",
            None,
            false,
        )
        .await;
        assert!(response.starts_with("Multiple agents with name literature_agent"));

        let codename = registry.codenames_by_name("literature_agent")[1].clone();
        let response = call_expert_agent(
            &registry,
            None,
            "literature_agent",
            "FOXO3 papers",
            Some(&codename),
            false,
        )
        .await;
        assert!(response.starts_with("Agent literature_agent response:"));
    }

    #[tokio::test]
    async fn bad_codename_lists_the_valid_ones() {
        let registry = registry_with(&["structure_agent", "structure_agent"]);
        let response = call_expert_agent(
            &registry,
            None,
            "structure_agent",
            "NRF2 domains",
            Some("structure_agent-ffffffff"),
            false,
        )
        .await;
        assert!(response.starts_with("Agent with codename structure_agent-ffffffff not found"));
        assert!(response.contains("existing codenames"));
    }

    #[tokio::test]
    async fn codename_of_another_agent_does_not_reroute() {
        let registry = registry_with(&["google_agent", "literature_agent", "literature_agent"]);
        let foreign = registry.codenames_by_name("google_agent")[0].clone();

        let response = call_expert_agent(
            &registry,
            None,
            "literature_agent",
            "FOXO3 papers",
            Some(&foreign),
            false,
        )
        .await;
        assert!(response.starts_with(&format!("Agent with codename {foreign} not found")));
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_lose_the_response() {
        // Point the cache at a path that cannot be a directory.
        let temp = TempDir::new().expect("temp dir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").expect("seed blocker");
        let cache = ResultCache::new(blocker.join("nested"));

        let registry = registry_with(&["opengenes_agent"]);
        let response = call_expert_agent(
            &registry,
            Some(&cache),
            "opengenes_agent",
            "NRF2 aging evidence",
            None,
            true,
        )
        .await;

        assert!(response.starts_with("Agent opengenes_agent response:"));
    }
}
