//! Expert agent profiles, registry, and delegation for GeneForest.
//!
//! Agents here are thin proxies: a profile (prompt + remote MCP toolset)
//! bound to a [`ToolRuntime`] that does the actual LLM/tool loop. The
//! orchestrator reaches experts through [`call_expert_agent`], which also
//! persists every exchange to the result cache.

mod delegate;
mod expert;
mod profile;
mod registry;
mod runtime;
mod toolset;

pub use delegate::call_expert_agent;
pub use expert::ExpertAgent;
pub use profile::AgentProfile;
pub use registry::{AgentRegistry, RegisteredAgent};
pub use runtime::{DynToolRuntime, OfflineRuntime, ToolRuntime};
pub use toolset::{McpServer, McpToolset};

use std::sync::Arc;

use tracing::info;

use geneforest_core::{Config, GeneForestError, ORCHESTRATOR_AGENT, prompts};

/// Instantiate every configured agent against the given runtime.
///
/// The orchestrator's prompt picks up the cache-usage instructions only
/// when caching is enabled and no explicit prompt override is configured.
pub fn load_agents(
    config: &Config,
    runtime: DynToolRuntime,
) -> Result<AgentRegistry, GeneForestError> {
    let registry = AgentRegistry::new();

    for agent_config in &config.agents {
        let mut profile = AgentProfile::from_config(agent_config)?;
        if agent_config.name == ORCHESTRATOR_AGENT && agent_config.system_prompt.is_none() {
            profile = profile.with_system_prompt(prompts::orchestrator_prompt(config.cache.enabled));
        }

        let description = profile.description.clone();
        let codename = registry.register(Arc::new(ExpertAgent::new(profile, runtime.clone())));
        info!(agent = %agent_config.name, %codename, %description, "agent loaded");
    }

    Ok(registry)
}
