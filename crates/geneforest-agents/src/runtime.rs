use std::sync::Arc;

use async_trait::async_trait;

use geneforest_core::prompts::REPORT_END_MARKER;

use crate::profile::AgentProfile;

/// Boundary to the external agent framework.
///
/// A runtime takes an agent profile (system prompt + toolset) and a user
/// prompt, runs the LLM/tool loop against the profile's remote MCP server,
/// and returns the final free-text answer. Which tools get called and in
/// what order is entirely the runtime's business.
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    async fn execute(&self, profile: &AgentProfile, prompt: &str) -> anyhow::Result<String>;
}

pub type DynToolRuntime = Arc<dyn ToolRuntime>;

/// Runtime for offline runs and tests: no network, deterministic output.
#[derive(Debug, Default)]
pub struct OfflineRuntime;

impl OfflineRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRuntime for OfflineRuntime {
    async fn execute(&self, profile: &AgentProfile, prompt: &str) -> anyhow::Result<String> {
        let head: String = prompt.chars().take(200).collect();
        Ok(format!(
            "# Offline response from {}\n\nNo remote agent runtime is configured; echoing the request.\n\n> {}\n\n{}",
            profile.name, head, REPORT_END_MARKER
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_runtime_names_the_agent_and_terminates_reports() {
        let profile = AgentProfile {
            name: "biomart_agent".to_string(),
            description: String::new(),
            system_prompt: "prompt".to_string(),
            toolset: None,
        };

        let response = OfflineRuntime::new()
            .execute(&profile, "TP53 orthologs?")
            .await
            .expect("offline response");
        assert!(response.contains("biomart_agent"));
        assert!(response.contains("TP53 orthologs?"));
        assert!(response.contains(REPORT_END_MARKER));
    }
}
