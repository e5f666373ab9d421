use geneforest_core::{AgentProfileConfig, GeneForestError, prompts};

use crate::toolset::McpToolset;

/// Everything that defines one agent: identity, voice, and toolset.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub toolset: Option<McpToolset>,
}

impl AgentProfile {
    /// Build a profile from configuration, falling back to the built-in
    /// prompt for well-known agent names.
    pub fn from_config(config: &AgentProfileConfig) -> Result<Self, GeneForestError> {
        let system_prompt = config
            .system_prompt
            .clone()
            .or_else(|| prompts::default_prompt_for(&config.name).map(str::to_string))
            .ok_or_else(|| {
                GeneForestError::InvalidConfiguration(format!(
                    "agent '{}' has no system prompt and no built-in default",
                    config.name
                ))
            })?;

        Ok(Self {
            name: config.name.clone(),
            description: config.description.clone(),
            system_prompt,
            toolset: config.mcp.as_ref().map(McpToolset::from_config),
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}
