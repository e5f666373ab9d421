use std::path::PathBuf;

use async_trait::async_trait;
use graph_flow::{Context, NextAction, Task, TaskResult};
use tracing::{debug, info, instrument, warn};

use crate::executor::DynAgentExecutor;
use crate::prompts::{self, CONTINUATION_PROMPT, REPORT_END_MARKER};
use crate::report::{save_markdown_report, validate_markdown};
use crate::trace::TraceEvent;

/// Upper bound on report continuation rounds. A model that never emits the
/// end marker would otherwise loop forever; past this bound the truncated
/// report is kept and flagged.
pub const MAX_CONTINUATIONS: u32 = 8;

async fn push_trace(context: &Context, task_id: &str, message: String) {
    let mut events: Vec<TraceEvent> = context.get("trace.events").await.unwrap_or_default();
    events.push(TraceEvent::new(task_id, message));
    context.set("trace.events", &events).await;
}

/// Queries the orchestrator agent for a full gene report, continuing until
/// the report-end marker appears or the continuation budget runs out.
pub struct GeneAnalysisTask {
    executor: DynAgentExecutor,
}

impl GeneAnalysisTask {
    pub fn new(executor: DynAgentExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Task for GeneAnalysisTask {
    fn id(&self) -> &str {
        "analysis"
    }

    #[instrument(name = "task.analysis", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let gene: String = context
            .get("gene")
            .await
            .unwrap_or_else(|| "NRF2".to_string());

        info!(%gene, agent = %self.executor.name(), "starting gene analysis");

        let mut report = match self.executor.query(&prompts::gene_analysis_prompt(&gene)).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%gene, error = %err, "orchestrator query failed");
                let summary = format!("Analysis failed for \"{gene}\": {err}");
                push_trace(&context, self.id(), summary.clone()).await;
                context.set("final.summary", summary.clone()).await;
                context.set("final.requires_review", true).await;
                return Ok(TaskResult::new(Some(summary), NextAction::End));
            }
        };

        let mut continuations: u32 = 0;
        let mut truncated = false;
        while !report.contains(REPORT_END_MARKER) {
            if continuations >= MAX_CONTINUATIONS {
                warn!(%gene, continuations, "continuation budget exhausted, keeping truncated report");
                truncated = true;
                break;
            }
            continuations += 1;
            debug!(%gene, continuations, "report end marker missing, requesting continuation");

            match self.executor.query(CONTINUATION_PROMPT).await {
                Ok(chunk) if !chunk.trim().is_empty() => report.push_str(&chunk),
                Ok(_) => {
                    warn!(%gene, continuations, "empty continuation response, keeping truncated report");
                    truncated = true;
                    break;
                }
                Err(err) => {
                    warn!(%gene, continuations, error = %err, "continuation query failed, keeping truncated report");
                    truncated = true;
                    break;
                }
            }
        }

        context.set("analysis.report", report).await;
        context.set("analysis.continuations", continuations).await;
        context.set("analysis.truncated", truncated).await;

        push_trace(
            &context,
            self.id(),
            format!(
                "report generated for {gene} after {continuations} continuation(s){}",
                if truncated { ", truncated" } else { "" }
            ),
        )
        .await;

        Ok(TaskResult::new(
            Some(format!("Analysis completed for \"{gene}\"")),
            NextAction::ContinueAndExecute,
        ))
    }
}

/// Persists the generated report as a timestamped markdown file.
pub struct ReportTask {
    output_dir: PathBuf,
}

impl ReportTask {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Task for ReportTask {
    fn id(&self) -> &str {
        "report"
    }

    #[instrument(name = "task.report", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let gene: String = context
            .get("gene")
            .await
            .unwrap_or_else(|| "NRF2".to_string());
        let report: String = context.get("analysis.report").await.unwrap_or_default();

        match save_markdown_report(&self.output_dir, &gene, &report) {
            Ok(path) => {
                let display = path.display().to_string();
                context.set("report.path", display.clone()).await;
                push_trace(&context, self.id(), format!("report saved to {display}")).await;
                Ok(TaskResult::new(
                    Some(format!("Report saved to {display}")),
                    NextAction::ContinueAndExecute,
                ))
            }
            Err(err) => {
                warn!(%gene, error = %err, "failed to persist report");
                let summary = format!("Report for \"{gene}\" could not be saved: {err}");
                push_trace(&context, self.id(), summary.clone()).await;
                context.set("final.summary", summary.clone()).await;
                context.set("final.requires_review", true).await;
                Ok(TaskResult::new(Some(summary), NextAction::End))
            }
        }
    }
}

/// Runs markdown structure checks over the generated report and records the
/// verdict for the conditional edge.
#[derive(Default)]
pub struct ValidateTask;

#[async_trait]
impl Task for ValidateTask {
    fn id(&self) -> &str {
        "validate"
    }

    #[instrument(name = "task.validate", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let report: String = context.get("analysis.report").await.unwrap_or_default();
        let truncated: bool = context.get("analysis.truncated").await.unwrap_or(false);

        let validation = validate_markdown(&report);
        let passed = validation.is_valid() && !truncated;

        info!(
            passed,
            issues = validation.issues.len(),
            has_headers = validation.has_headers,
            "markdown validation complete"
        );

        push_trace(
            &context,
            self.id(),
            if passed {
                "all markdown checks passed".to_string()
            } else {
                format!("validation raised {} issue(s)", validation.issues.len())
            },
        )
        .await;

        context.set("validate.summary", &validation).await;
        context.set_sync("validate.passed", passed);

        Ok(TaskResult::new(
            Some("Validation complete".to_string()),
            NextAction::ContinueAndExecute,
        ))
    }
}

/// Terminal task for a validated analysis.
#[derive(Default)]
pub struct FinalizeTask;

#[async_trait]
impl Task for FinalizeTask {
    fn id(&self) -> &str {
        "finalize"
    }

    #[instrument(name = "task.finalize", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let gene: String = context.get("gene").await.unwrap_or_default();
        let report_path: String = context
            .get("report.path")
            .await
            .unwrap_or_else(|| "(not saved)".to_string());

        let summary = format!("✓ {gene}: report saved and validated: {report_path}");
        context.set("final.summary", summary.clone()).await;
        context.set("final.requires_review", false).await;
        push_trace(&context, self.id(), "analysis finalized".to_string()).await;

        info!(%gene, "analysis finalized");
        Ok(TaskResult::new(Some(summary), NextAction::End))
    }
}

/// Terminal task for an analysis whose report needs a human look.
#[derive(Default)]
pub struct ReviewTask;

#[async_trait]
impl Task for ReviewTask {
    fn id(&self) -> &str {
        "review"
    }

    #[instrument(name = "task.review", skip(self, context))]
    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let gene: String = context.get("gene").await.unwrap_or_default();
        let report_path: String = context
            .get("report.path")
            .await
            .unwrap_or_else(|| "(not saved)".to_string());
        let validation: crate::report::MarkdownValidation = context
            .get("validate.summary")
            .await
            .unwrap_or_default();

        let issues = if validation.issues.is_empty() {
            "report truncated before the end marker".to_string()
        } else {
            validation.issues.join("; ")
        };

        let summary =
            format!("⚠ {gene}: report saved but needs review: {report_path} ({issues})");
        context.set("final.summary", summary.clone()).await;
        context.set("final.requires_review", true).await;
        push_trace(&context, self.id(), "flagged for manual review".to_string()).await;

        info!(%gene, "analysis flagged for review");
        Ok(TaskResult::new(Some(summary), NextAction::End))
    }
}
