//! Markdown report persistence and structural validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of the markdown structure checks.
///
/// These are heuristics, not a parser: they catch the usual failure modes of
/// model-generated markdown (unbalanced link brackets, an odd number of code
/// fences, empty output) without judging content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkdownValidation {
    pub has_headers: bool,
    pub has_links: bool,
    pub has_code_blocks: bool,
    pub issues: Vec<String>,
}

impl MarkdownValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Save a gene analysis report under `dir` as `{gene}_{timestamp}.md`.
pub fn save_markdown_report(dir: &Path, gene_name: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let safe_gene: String = gene_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let path = dir.join(format!("{safe_gene}_{timestamp}.md"));

    fs::write(&path, content)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "report saved");
    Ok(path)
}

/// Run structural checks over markdown content.
pub fn validate_markdown(content: &str) -> MarkdownValidation {
    let mut validation = MarkdownValidation {
        has_headers: content.contains('#'),
        has_links: content.contains('[') && content.contains(']'),
        has_code_blocks: content.contains("```"),
        issues: Vec::new(),
    };

    if content.trim().is_empty() {
        validation.issues.push("file is empty".to_string());
        return validation;
    }

    let open_brackets = content.matches('[').count();
    let close_brackets = content.matches(']').count();
    if open_brackets != close_brackets {
        validation.issues.push(format!(
            "unbalanced brackets: {open_brackets} [ vs {close_brackets} ]"
        ));
    }

    let fence_count = content.matches("```").count();
    if fence_count % 2 != 0 {
        validation.issues.push(format!(
            "unbalanced code blocks: {fence_count} (should be even)"
        ));
    }

    validation
}
