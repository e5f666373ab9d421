use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::prompts::REPORT_END_MARKER;

/// Boundary to the external agent framework: anything that can take a
/// free-text prompt and produce a free-text answer. The workflow only ever
/// talks to the orchestrator through this seam.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, prompt: &str) -> anyhow::Result<String>;
}

pub type DynAgentExecutor = Arc<dyn AgentExecutor>;

/// Deterministic executor for tests and offline runs.
///
/// Returns scripted responses in order, then falls back to a canned report
/// that carries the report-end marker so sessions always terminate.
pub struct StubExecutor {
    name: String,
    scripted: Mutex<VecDeque<String>>,
    fallback: String,
}

impl StubExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scripted: Mutex::new(VecDeque::new()),
            fallback: format!(
                "# Offline analysis\n\nNo remote runtime configured; returning placeholder report.\n\n{REPORT_END_MARKER}"
            ),
        }
    }

    /// Queue responses to return before the fallback kicks in.
    pub fn with_responses<I, S>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripted = Mutex::new(responses.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }
}

#[async_trait]
impl AgentExecutor for StubExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _prompt: &str) -> anyhow::Result<String> {
        let next = self
            .scripted
            .lock()
            .expect("stub executor script poisoned")
            .pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_drain_then_fallback() {
        let stub = StubExecutor::new("query_agent")
            .with_responses(["partial report without marker", "tail of the report"]);

        assert_eq!(
            stub.query("first").await.unwrap(),
            "partial report without marker"
        );
        assert_eq!(stub.query("second").await.unwrap(), "tail of the report");
        assert!(stub.query("third").await.unwrap().contains(REPORT_END_MARKER));
    }
}
