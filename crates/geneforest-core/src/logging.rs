use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::warn;

const LOG_DIR_ENV: &str = "GENEFOREST_LOG_DIR";
const RETENTION_ENV: &str = "GENEFOREST_LOG_RETENTION_DAYS";
const DEFAULT_LOG_DIR: &str = "data/logs";
const DEFAULT_RETENTION_DAYS: u64 = 90;

static REDACTION_PATTERNS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    vec![
        (
            "api_key".to_string(),
            Regex::new(r"(?i)(api[_-]?key\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid api_key regex"),
        ),
        (
            "secret".to_string(),
            Regex::new(r"(?i)(secret\s*[:=]\s*)([A-Za-z0-9\-_.+/]+)")
                .expect("invalid secret regex"),
        ),
        (
            "bearer".to_string(),
            Regex::new(r"(?i)(bearer\s+)([A-Za-z0-9\-_.+=/]+)").expect("invalid bearer regex"),
        ),
        (
            "sk_token".to_string(),
            Regex::new(r"(sk-[A-Za-z0-9]{16,})").expect("invalid sk_token regex"),
        ),
    ]
});

/// Resolve the default analysis log directory (`GENEFOREST_LOG_DIR`
/// override, `data/logs` otherwise).
pub fn default_log_dir() -> PathBuf {
    std::env::var(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR))
}

fn retention_days() -> u64 {
    std::env::var(RETENTION_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

/// One completed gene analysis, as recorded in the durable log.
#[derive(Debug, Clone)]
pub struct AnalysisLogInput {
    pub session_id: String,
    pub gene: String,
    pub summary: String,
    pub report_path: Option<String>,
    pub validation_passed: bool,
    pub cache_enabled: bool,
    pub continuations: u32,
    pub trace_path: Option<String>,
}

#[derive(Serialize)]
struct AnalysisLogRecord {
    timestamp: String,
    session_id: String,
    gene: String,
    summary: String,
    report_path: Option<String>,
    validation_passed: bool,
    cache_enabled: bool,
    continuations: u32,
    trace_path: Option<String>,
    redactions: Vec<String>,
}

#[derive(Serialize)]
struct AuditLogRecord {
    timestamp: String,
    session_id: String,
    redactions: Vec<String>,
}

fn append_json_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let line = serde_json::to_string(value)?;
    writeln!(writer, "{}", line)
        .with_context(|| format!("failed to append log entry to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn sanitize_text(input: &str, redactions: &mut HashSet<String>) -> String {
    let mut output = input.to_string();
    for (name, regex) in REDACTION_PATTERNS.iter() {
        let mut matched = false;
        output = regex
            .replace_all(&output, |caps: &Captures| {
                matched = true;
                if caps.len() > 1 {
                    format!("{}[REDACTED]", &caps[1])
                } else {
                    "[REDACTED]".to_string()
                }
            })
            .to_string();
        if matched {
            redactions.insert(name.clone());
        }
    }
    output
}

/// Append one analysis completion record to the monthly JSONL log under
/// `base_dir`, redacting anything that looks like a credential. Redacted
/// records additionally land in a monthly audit log.
pub fn log_analysis_completion(base_dir: &Path, input: AnalysisLogInput) -> Result<()> {
    let timestamp = Utc::now();
    let mut redactions = HashSet::new();

    let summary = sanitize_text(&input.summary, &mut redactions);
    let gene = sanitize_text(&input.gene, &mut redactions);

    let record = AnalysisLogRecord {
        timestamp: timestamp.to_rfc3339(),
        session_id: input.session_id.clone(),
        gene,
        summary,
        report_path: input.report_path,
        validation_passed: input.validation_passed,
        cache_enabled: input.cache_enabled,
        continuations: input.continuations,
        trace_path: input.trace_path,
        redactions: redactions.iter().cloned().collect(),
    };

    let month_dir = base_dir
        .join(format!("{:04}", timestamp.year()))
        .join(format!("{:02}", timestamp.month()));
    let analysis_log_path = month_dir.join("analysis.jsonl");
    append_json_line(&analysis_log_path, &record)?;

    if !record.redactions.is_empty() {
        let audit = AuditLogRecord {
            timestamp: record.timestamp.clone(),
            session_id: input.session_id.clone(),
            redactions: record.redactions.clone(),
        };
        let audit_path = month_dir.join("audit.jsonl");
        append_json_line(&audit_path, &audit)?;
        warn!(
            session_id = %input.session_id,
            fields = ?record.redactions,
            "redacted potential secrets from analysis log"
        );
    }

    enforce_retention(base_dir)?;

    Ok(())
}

fn enforce_retention(base_dir: &Path) -> Result<()> {
    let retention = retention_days();
    if retention == 0 || !base_dir.exists() {
        return Ok(());
    }
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention.saturating_mul(86_400)))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    prune_directory(base_dir, cutoff)?;
    Ok(())
}

fn prune_directory(dir: &Path, cutoff: SystemTime) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            prune_directory(&path, cutoff)?;
            if path.read_dir()?.next().is_none() {
                fs::remove_dir(&path).ok();
            }
        } else if metadata.is_file()
            && metadata
                .modified()
                .map(|time| time < cutoff)
                .unwrap_or(false)
        {
            fs::remove_file(&path).ok();
        }
    }

    Ok(())
}

/// Remove every log line belonging to a session (right-to-erasure hook).
pub fn remove_session_logs(base_dir: &Path, session_id: &str) -> Result<()> {
    if !base_dir.exists() {
        return Ok(());
    }

    for year_entry in fs::read_dir(base_dir)? {
        let year_entry = year_entry?;
        if !year_entry.file_type()?.is_dir() {
            continue;
        }
        for month_entry in fs::read_dir(year_entry.path())? {
            let month_entry = month_entry?;
            if !month_entry.file_type()?.is_dir() {
                continue;
            }
            let analysis_path = month_entry.path().join("analysis.jsonl");
            rewrite_jsonl_without(&analysis_path, session_id)?;
            cleanup_empty_file(&analysis_path)?;

            let audit_path = month_entry.path().join("audit.jsonl");
            rewrite_jsonl_without(&audit_path, session_id)?;
            cleanup_empty_file(&audit_path)?;

            if month_entry.path().read_dir()?.next().is_none() {
                fs::remove_dir(month_entry.path()).ok();
            }
        }
        if year_entry.path().read_dir()?.next().is_none() {
            fs::remove_dir(year_entry.path()).ok();
        }
    }

    Ok(())
}

fn rewrite_jsonl_without(path: &Path, session_id: &str) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let file =
        File::open(path).with_context(|| format!("failed to open log file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut retained = Vec::new();
    let mut removed = false;
    for line in reader.lines() {
        let line = line?;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) {
            if value.get("session_id").and_then(|v| v.as_str()) == Some(session_id) {
                removed = true;
                continue;
            }
        }
        retained.push(line);
    }

    if removed {
        let file = File::create(path)
            .with_context(|| format!("failed to rewrite log file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for line in retained {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
    }

    Ok(())
}

fn cleanup_empty_file(path: &Path) -> Result<()> {
    if path.exists() {
        let metadata = path.metadata()?;
        if metadata.len() == 0 {
            fs::remove_file(path).ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn input(session_id: &str, summary: &str) -> AnalysisLogInput {
        AnalysisLogInput {
            session_id: session_id.to_string(),
            gene: "NRF2".to_string(),
            summary: summary.to_string(),
            report_path: Some("data/output/NRF2_20250101_000000.md".to_string()),
            validation_passed: true,
            cache_enabled: true,
            continuations: 1,
            trace_path: None,
        }
    }

    #[test]
    fn analysis_logging_sanitizes_and_persists() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");

        log_analysis_completion(
            temp.path(),
            input("test-session", "Summary with api_key=abcd1234"),
        )?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        let analysis_log = month_dir.join("analysis.jsonl");
        assert!(analysis_log.exists());
        let line = std::fs::read_to_string(&analysis_log)?;
        let record: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(record["session_id"], "test-session");
        assert_eq!(record["gene"], "NRF2");
        assert!(record["summary"].as_str().unwrap().contains("[REDACTED]"));

        let audit_log = month_dir.join("audit.jsonl");
        assert!(audit_log.exists());

        Ok(())
    }

    #[test]
    fn clean_summaries_skip_the_audit_log() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");

        log_analysis_completion(temp.path(), input("clean-session", "NRF2 report validated"))?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        assert!(month_dir.join("analysis.jsonl").exists());
        assert!(!month_dir.join("audit.jsonl").exists());

        Ok(())
    }

    #[test]
    fn remove_session_logs_drops_only_that_session() -> Result<()> {
        let temp = TempDir::new().expect("temp dir");

        log_analysis_completion(temp.path(), input("keep-me", "first"))?;
        log_analysis_completion(temp.path(), input("drop-me", "second"))?;

        remove_session_logs(temp.path(), "drop-me")?;

        let year_dir = temp.path().read_dir()?.next().unwrap()?.path();
        let month_dir = year_dir.read_dir()?.next().unwrap()?.path();
        let contents = std::fs::read_to_string(month_dir.join("analysis.jsonl"))?;
        assert!(contents.contains("keep-me"));
        assert!(!contents.contains("drop-me"));

        Ok(())
    }
}
