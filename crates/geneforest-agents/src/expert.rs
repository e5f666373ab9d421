use async_trait::async_trait;
use tracing::debug;

use geneforest_core::AgentExecutor;

use crate::profile::AgentProfile;
use crate::runtime::DynToolRuntime;

/// An agent instance: a profile bound to a runtime. Thin by design — the
/// runtime does the talking, the profile says who is talking.
pub struct ExpertAgent {
    profile: AgentProfile,
    runtime: DynToolRuntime,
}

impl ExpertAgent {
    pub fn new(profile: AgentProfile, runtime: DynToolRuntime) -> Self {
        Self { profile, runtime }
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }
}

#[async_trait]
impl AgentExecutor for ExpertAgent {
    fn name(&self) -> &str {
        &self.profile.name
    }

    async fn query(&self, prompt: &str) -> anyhow::Result<String> {
        debug!(
            agent = %self.profile.name,
            prompt_len = prompt.len(),
            "dispatching query to agent runtime"
        );
        self.runtime.execute(&self.profile, prompt).await
    }
}
