//! Remote MCP toolset attachments for expert agents.
//!
//! Each expert proxies one remote MCP tool server. The include/exclude
//! lists keep an expert's context small: the slim selections mirror what
//! gene-to-function analysis actually needs from each server.

use geneforest_core::McpConfig;
use serde::{Deserialize, Serialize};

/// A remote MCP tool server reachable over streamable HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub name: String,
    pub url: String,
}

/// A server plus the tool filter an agent sees it through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolset {
    pub server: McpServer,
    /// When non-empty, only these tools are exposed.
    pub only_include_tools: Vec<String>,
    /// Always hidden, even when include-listed.
    pub exclude_tools: Vec<String>,
}

impl McpToolset {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            only_include_tools: Vec::new(),
            exclude_tools: Vec::new(),
        }
    }

    pub fn from_config(config: &McpConfig) -> Self {
        Self {
            server: McpServer {
                name: config.server.clone(),
                url: config.url.clone(),
            },
            only_include_tools: config.only_include_tools.clone(),
            exclude_tools: config.exclude_tools.clone(),
        }
    }

    /// Whether the agent may see this tool. Exclusion always wins; an empty
    /// include list means every non-excluded tool is visible.
    pub fn allows(&self, tool: &str) -> bool {
        if self.exclude_tools.iter().any(|t| t == tool) {
            return false;
        }
        self.only_include_tools.is_empty() || self.only_include_tools.iter().any(|t| t == tool)
    }

    /// Filter a server-advertised tool list down to what this agent sees.
    pub fn visible_tools<'a>(&self, advertised: &'a [String]) -> Vec<&'a str> {
        advertised
            .iter()
            .map(String::as_str)
            .filter(|tool| self.allows(tool))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolset(include: &[&str], exclude: &[&str]) -> McpToolset {
        McpToolset {
            server: McpServer {
                name: "biomart-mcp".to_string(),
                url: "https://biomart-mcp.longevity-genie.info/mcp".to_string(),
            },
            only_include_tools: include.iter().map(|s| s.to_string()).collect(),
            exclude_tools: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_include_list_allows_everything_not_excluded() {
        let toolset = toolset(&[], &["get_string_network_image"]);
        assert!(toolset.allows("get_data"));
        assert!(!toolset.allows("get_string_network_image"));
    }

    #[test]
    fn include_list_restricts_visibility() {
        let toolset = toolset(&["get_data", "list_filters"], &[]);
        assert!(toolset.allows("get_data"));
        assert!(!toolset.allows("batch_translate"));
    }

    #[test]
    fn exclusion_beats_inclusion() {
        let toolset = toolset(&["get_data"], &["get_data"]);
        assert!(!toolset.allows("get_data"));
    }

    #[test]
    fn visible_tools_filters_an_advertised_list() {
        let toolset = toolset(&["get_data", "list_filters"], &["list_filters"]);
        let advertised: Vec<String> = ["get_data", "list_filters", "list_marts"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(toolset.visible_tools(&advertised), vec!["get_data"]);
    }
}
