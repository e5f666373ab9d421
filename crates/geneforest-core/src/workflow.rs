use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use graph_flow::{
    ExecutionStatus, FlowRunner, GraphBuilder, InMemorySessionStorage, Session, SessionStorage,
    Task,
};
use tracing::warn;

use crate::executor::DynAgentExecutor;
use crate::tasks::{FinalizeTask, GeneAnalysisTask, ReportTask, ReviewTask, ValidateTask};
use crate::trace::{TraceCollector, TraceEvent, TraceSummary, persist_trace};

const DEFAULT_REPORT_DIR: &str = "data/output";
const DEFAULT_TRACE_DIR: &str = "data/traces";

struct AnalysisTasks {
    analysis: Arc<GeneAnalysisTask>,
    report: Arc<ReportTask>,
    validate: Arc<ValidateTask>,
    finalize: Arc<FinalizeTask>,
    review: Arc<ReviewTask>,
}

fn build_graph(options: &AnalysisOptions) -> (Arc<graph_flow::Graph>, AnalysisTasks) {
    let tasks = AnalysisTasks {
        analysis: Arc::new(GeneAnalysisTask::new(options.executor.clone())),
        report: Arc::new(ReportTask::new(options.report_dir.clone())),
        validate: Arc::new(ValidateTask),
        finalize: Arc::new(FinalizeTask),
        review: Arc::new(ReviewTask),
    };

    let builder = GraphBuilder::new("geneforest_workflow")
        .add_task(tasks.analysis.clone())
        .add_task(tasks.report.clone())
        .add_task(tasks.validate.clone())
        .add_task(tasks.finalize.clone())
        .add_task(tasks.review.clone())
        .add_edge(tasks.analysis.id(), tasks.report.id())
        .add_edge(tasks.report.id(), tasks.validate.id())
        .add_conditional_edge(
            tasks.validate.id(),
            |ctx| ctx.get_sync::<bool>("validate.passed").unwrap_or(false),
            tasks.finalize.id(),
            tasks.review.id(),
        )
        .set_start_task(tasks.analysis.id());

    (Arc::new(builder.build()), tasks)
}

fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("session-{}", nanos)
}

/// Options for running a gene analysis session.
pub struct AnalysisOptions {
    pub gene: String,
    pub executor: DynAgentExecutor,
    pub session_id: Option<String>,
    pub report_dir: PathBuf,
    pub trace_dir: Option<PathBuf>,
}

impl AnalysisOptions {
    pub fn new(gene: impl Into<String>, executor: DynAgentExecutor) -> Self {
        Self {
            gene: gene.into(),
            executor,
            session_id: None,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            trace_dir: Some(PathBuf::from(DEFAULT_TRACE_DIR)),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_trace_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.trace_dir = dir;
        self
    }
}

/// Everything a caller needs to know about a finished session.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub session_id: String,
    pub gene: String,
    pub summary: String,
    pub report_path: Option<PathBuf>,
    pub validation_passed: bool,
    pub requires_review: bool,
    pub continuations: u32,
    pub truncated: bool,
    pub trace_summary: TraceSummary,
    pub trace_path: Option<PathBuf>,
}

/// Run a gene analysis end-to-end with default storage locations.
pub async fn run_analysis_session(gene: &str, executor: DynAgentExecutor) -> Result<AnalysisOutcome> {
    run_analysis_session_with_options(AnalysisOptions::new(gene, executor)).await
}

/// Run a gene analysis with custom options (session ID, storage dirs).
pub async fn run_analysis_session_with_options(options: AnalysisOptions) -> Result<AnalysisOutcome> {
    let (graph, tasks) = build_graph(&options);

    let storage = Arc::new(InMemorySessionStorage::new());
    let runner = FlowRunner::new(graph, storage.clone());

    let session_id = options.session_id.clone().unwrap_or_else(new_session_id);
    let session = Session::new_from_task(session_id.clone(), tasks.analysis.id());

    session.context.set("gene", options.gene.clone()).await;

    storage
        .save(session)
        .await
        .map_err(|err| anyhow!("failed to persist session: {err}"))?;

    loop {
        let result = runner
            .run(&session_id)
            .await
            .map_err(|err| anyhow!("graph execution failure: {err}"))?;

        match result.status {
            ExecutionStatus::Completed => break,
            ExecutionStatus::WaitingForInput => continue,
            ExecutionStatus::Error(message) => return Err(anyhow!(message)),
        }
    }

    let session = storage
        .get(&session_id)
        .await
        .map_err(|err| anyhow!("failed to reload session: {err}"))?
        .ok_or_else(|| anyhow!("session missing after execution"))?;

    let summary: String = session
        .context
        .get("final.summary")
        .await
        .unwrap_or_else(|| "No final summary recorded".to_string());
    let requires_review: bool = session
        .context
        .get("final.requires_review")
        .await
        .unwrap_or(false);
    let report_path: Option<PathBuf> = session
        .context
        .get::<String>("report.path")
        .await
        .map(PathBuf::from);
    let validation_passed: bool = session
        .context
        .get("validate.passed")
        .await
        .unwrap_or(false);
    let continuations: u32 = session
        .context
        .get("analysis.continuations")
        .await
        .unwrap_or(0);
    let truncated: bool = session
        .context
        .get("analysis.truncated")
        .await
        .unwrap_or(false);
    let trace_events: Vec<TraceEvent> =
        session.context.get("trace.events").await.unwrap_or_default();
    let trace = TraceCollector::from_events(trace_events);

    let trace_path = match options.trace_dir.as_ref() {
        Some(dir) => match persist_trace(dir, &session_id, trace.events()) {
            Ok(path) => Some(path),
            Err(err) => {
                // The trace is diagnostics; losing it must not fail the run.
                warn!(error = %err, "failed to persist session trace");
                None
            }
        },
        None => None,
    };

    Ok(AnalysisOutcome {
        session_id,
        gene: options.gene,
        summary,
        report_path,
        validation_passed,
        requires_review,
        continuations,
        truncated,
        trace_summary: trace.summary(),
        trace_path,
    })
}
