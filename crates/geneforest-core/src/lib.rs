//! GeneForest core abstractions built directly on top of `graph_flow`.
//!
//! This crate provides the result cache, report tooling, and workflow tasks
//! used to orchestrate gene-to-function analysis sessions over a delegated
//! set of expert agents.

mod cache;
mod config;
mod error;
mod executor;
mod logging;
pub mod metrics;
pub mod prompts;
mod report;
mod security;
mod tasks;
mod telemetry;
mod trace;
mod workflow;

pub use cache::{
    CachedQuery, CachedResult, QUERY_MARKER, RESULT_MARKER, ResultCache, parse_sections,
};
pub use config::{
    AgentProfileConfig, CacheConfig, Config, ConfigLoader, LlmConfig, LoggingConfig, McpConfig,
    ORCHESTRATOR_AGENT, ReportConfig,
};
pub use error::{CacheError, GeneForestError};
pub use executor::{AgentExecutor, DynAgentExecutor, StubExecutor};
pub use logging::{
    AnalysisLogInput, default_log_dir, log_analysis_completion, remove_session_logs,
};
pub use report::{MarkdownValidation, save_markdown_report, validate_markdown};
pub use security::{SecretValue, require_env};
pub use tasks::{
    FinalizeTask, GeneAnalysisTask, MAX_CONTINUATIONS, ReportTask, ReviewTask, ValidateTask,
};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use trace::{TraceCollector, TraceEvent, TraceStep, TraceSummary, persist_trace};
pub use workflow::{
    AnalysisOptions, AnalysisOutcome, run_analysis_session, run_analysis_session_with_options,
};
