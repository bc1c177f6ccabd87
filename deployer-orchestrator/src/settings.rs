//! Orchestrator settings

use deployer_core::domain::pipeline::DEPLOY_JOB_NAME;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// How a list of units is processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationPolicy {
    /// Keep deploying the remaining units after a failure
    pub continue_on_error: bool,
    /// Units allowed in flight at once; 1 deploys strictly in sequence
    pub max_concurrency: usize,
}

impl Default for OrchestrationPolicy {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            max_concurrency: 1,
        }
    }
}

impl OrchestrationPolicy {
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Sets the concurrency limit
    ///
    /// 0 is treated as 1; values above what a semaphore can hold are capped.
    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn is_sequential(&self) -> bool {
        self.max_concurrency <= 1
    }
}

/// Builds the human-followable link to a started job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLink {
    /// Web root of the CI/CD instance (e.g., "https://gitlab.com")
    pub web_url: String,
    /// Project path as shown in the web UI
    pub project_name: String,
}

impl JobLink {
    pub fn new(web_url: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            web_url: web_url.into(),
            project_name: project_name.into(),
        }
    }

    /// `<web_url>/<project_name>/-/jobs/<job_id>`
    pub fn job_url(&self, job_id: u64) -> String {
        format!(
            "{}/{}/-/jobs/{}",
            self.web_url.trim_end_matches('/'),
            self.project_name.trim_matches('/'),
            job_id
        )
    }
}

/// Everything the orchestrator needs besides the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorSettings {
    /// Name of the job started in each run
    pub job_name: String,
    pub job_link: JobLink,
    pub policy: OrchestrationPolicy,
}

impl OrchestratorSettings {
    pub fn new(job_link: JobLink) -> Self {
        Self {
            job_name: DEPLOY_JOB_NAME.to_string(),
            job_link,
            policy: OrchestrationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OrchestrationPolicy) -> Self {
        self.policy = policy;
        self
    }
}
