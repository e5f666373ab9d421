use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{GeneForestError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "GENEFOREST_CONFIG";
const EMBEDDED_DEFAULT: &str = include_str!("../config/default.toml");

/// Name of the orchestrator profile every configuration must provide.
pub const ORCHESTRATOR_AGENT: &str = "query_agent";

/// Top-level configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub agents: Vec<AgentProfileConfig>,
}

impl Config {
    /// Resolve the configured LLM secret value (from environment only).
    ///
    /// Resolution is deliberately lazy: offline and stub runs never touch
    /// the environment, so no credential is needed until a remote runtime
    /// is actually constructed.
    pub fn llm_api_key(&self) -> Result<SecretValue, GeneForestError> {
        require_env(&self.llm.api_key_env)
    }

    /// The built-in configuration shipped with the crate.
    pub fn embedded_default() -> Result<Config, GeneForestError> {
        let config: Config = toml::from_str(EMBEDDED_DEFAULT)
            .map_err(|err| GeneForestError::InvalidConfiguration(err.to_string()))?;
        ConfigLoader::validate(&config)?;
        Ok(config)
    }

    pub fn agent_profile(&self, name: &str) -> Option<&AgentProfileConfig> {
        self.agents.iter().find(|profile| profile.name == name)
    }
}

/// Helper to load configuration with best-practice guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `GENEFOREST_CONFIG` environment variable.
    /// 3. `config.toml` in the current working directory.
    /// 4. The embedded default configuration.
    pub fn load(path: Option<PathBuf>) -> Result<Config, GeneForestError> {
        let raw = match resolve_path(path) {
            Some(candidate) => fs::read_to_string(&candidate)
                .map_err(|err| GeneForestError::config_io(candidate.clone(), err))?,
            None => EMBEDDED_DEFAULT.to_string(),
        };
        let config: Config = toml::from_str(&raw)
            .map_err(|err| GeneForestError::InvalidConfiguration(err.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), GeneForestError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(GeneForestError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }

        if config.agent_profile(ORCHESTRATOR_AGENT).is_none() {
            return Err(GeneForestError::InvalidConfiguration(format!(
                "an agent profile named '{ORCHESTRATOR_AGENT}' is required"
            )));
        }

        for profile in &config.agents {
            if profile.name.trim().is_empty() {
                return Err(GeneForestError::InvalidConfiguration(
                    "agent profiles must be named".into(),
                ));
            }
            if let Some(mcp) = &profile.mcp {
                if mcp.url.trim().is_empty() {
                    return Err(GeneForestError::InvalidConfiguration(format!(
                        "agent '{}' has an MCP section without a url",
                        profile.name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return Some(default.to_path_buf());
    }

    None
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_dir")]
    pub dir: PathBuf,
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,
}

impl CacheConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("data/interim")
    }

    const fn default_enabled() -> bool {
        true
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            enabled: Self::default_enabled(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_dir")]
    pub dir: PathBuf,
}

impl ReportConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("data/output")
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Declarative description of one agent: who it is, how it speaks, and
/// which remote toolset it proxies.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentProfileConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Overrides the built-in prompt for this agent name when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub mcp: Option<McpConfig>,
}

/// Remote MCP tool server attachment for an agent profile.
#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    pub server: String,
    pub url: String,
    /// When non-empty, only these tools are exposed to the agent.
    #[serde(default)]
    pub only_include_tools: Vec<String>,
    /// Always hidden from the agent, even when include-listed.
    #[serde(default)]
    pub exclude_tools: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_parses_and_validates() {
        let config = Config::embedded_default().expect("embedded config");
        assert_eq!(config.llm.model, "claude-haiku-4-5");
        assert!(config.cache.enabled);
        assert!(config.agent_profile(ORCHESTRATOR_AGENT).is_some());
        assert_eq!(config.agents.len(), 7);
    }

    #[test]
    fn expert_profiles_carry_their_toolsets() {
        let config = Config::embedded_default().expect("embedded config");
        let biomart = config.agent_profile("biomart_agent").expect("biomart profile");
        let mcp = biomart.mcp.as_ref().expect("biomart mcp");
        assert!(mcp.url.contains("biomart"));
        assert!(mcp.only_include_tools.contains(&"get_data".to_string()));
    }

    #[test]
    fn missing_orchestrator_profile_is_rejected() {
        let raw = r#"
            [llm]
            provider = "anthropic"
            model = "claude-haiku-4-5"
            api_key_env = "ANTHROPIC_API_KEY"

            [[agents]]
            name = "google_agent"
        "#;
        let config: Config = toml::from_str(raw).expect("parse");
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, GeneForestError::InvalidConfiguration(_)));
    }

    #[test]
    fn empty_api_key_env_is_rejected() {
        let raw = r#"
            [llm]
            provider = "anthropic"
            model = "claude-haiku-4-5"

            [[agents]]
            name = "query_agent"
        "#;
        let config: Config = toml::from_str(raw).expect("parse");
        let err = ConfigLoader::validate(&config).unwrap_err();
        assert!(matches!(err, GeneForestError::InvalidConfiguration(_)));
    }
}
