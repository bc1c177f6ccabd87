//! Deployer HTTP Client
//!
//! Client for the GitLab pipeline trigger API.
//!
//! The deployment orchestrator only depends on the `PipelineClient` trait:
//! create a pipeline run, list its jobs, start one job. `GitlabClient` is the
//! HTTP implementation used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use deployer_client::{GitlabClient, GitlabSettings, PipelineClient};
//! use deployer_core::dto::pipeline::CreateRun;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GitlabClient::new(GitlabSettings::new(
//!         "https://gitlab.com",
//!         "1234",
//!         "private-token",
//!         "trigger-token",
//!     ))?;
//!
//!     let run = client
//!         .create_run(&CreateRun {
//!             client_id: "client1".to_string(),
//!             app_name: None,
//!         })
//!         .await?;
//!
//!     println!("Created pipeline: {}", run.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use deployer_core::domain::pipeline::{Job, PipelineRun};
use deployer_core::dto::pipeline::CreateRun;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::fmt;

/// Git ref pipelines are triggered on unless configured otherwise
pub const DEFAULT_REF: &str = "master";

/// Header carrying the access token on authenticated endpoints
const PRIVATE_TOKEN_HEADER: &str = "private-token";

/// Boundary to the remote CI/CD system
///
/// The three calls a deployment needs, in the order it makes them.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    /// Creates a pipeline run for one unit
    async fn create_run(&self, req: &CreateRun) -> Result<PipelineRun>;

    /// Lists every job of a run
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<Job>>;

    /// Starts (plays) a job
    async fn start_job(&self, job_id: u64) -> Result<Job>;
}

/// Connection settings for one GitLab project
#[derive(Clone)]
pub struct GitlabSettings {
    /// Base URL of the GitLab instance (e.g., "https://gitlab.com")
    pub base_url: String,
    /// Numeric project id or `group/project` path
    pub project_id: String,
    /// Access token for the jobs API
    pub private_token: String,
    /// Pipeline trigger token
    pub trigger_token: String,
    /// Ref the pipeline runs on
    pub git_ref: String,
}

impl GitlabSettings {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        private_token: impl Into<String>,
        trigger_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            private_token: private_token.into(),
            trigger_token: trigger_token.into(),
            git_ref: DEFAULT_REF.to_string(),
        }
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }
}

impl fmt::Debug for GitlabSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitlabSettings")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("private_token", &"<redacted>")
            .field("trigger_token", &"<redacted>")
            .field("git_ref", &self.git_ref)
            .finish()
    }
}

/// HTTP client for the GitLab v4 API, scoped to one project
#[derive(Debug, Clone)]
pub struct GitlabClient {
    /// Parsed instance root
    base_url: Url,
    settings: GitlabSettings,
    /// HTTP client instance
    client: Client,
}

impl GitlabClient {
    /// Create a new GitLab client
    ///
    /// # Example
    /// ```
    /// use deployer_client::{GitlabClient, GitlabSettings};
    ///
    /// let client = GitlabClient::new(GitlabSettings::new("https://gitlab.com", "42", "a", "b")).unwrap();
    /// assert_eq!(client.base_url().as_str(), "https://gitlab.com/");
    /// ```
    ///
    /// # Errors
    /// Returns `ClientError::InvalidUrl` if `base_url` is not an absolute
    /// http(s) URL with a host.
    pub fn new(settings: GitlabSettings) -> Result<Self> {
        Self::with_client(settings, Client::new())
    }

    /// Create a new GitLab client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(settings: GitlabSettings, client: Client) -> Result<Self> {
        let base_url = parse_base_url(&settings.base_url)?;
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    /// Get the base URL of the GitLab instance
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn settings(&self) -> &GitlabSettings {
        &self.settings
    }

    /// URL of a project endpoint
    ///
    /// Each segment is percent-encoded on its own, so a `group/project` id
    /// stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejected URLs that cannot be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "v4", "projects", self.settings.project_id.as_str()])
                .extend(segments);
        }
        url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Fail on non-2xx responses, keeping the body as the error message
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[async_trait]
impl PipelineClient for GitlabClient {
    async fn create_run(&self, req: &CreateRun) -> Result<PipelineRun> {
        self.trigger_pipeline(req).await
    }

    async fn list_jobs(&self, run_id: u64) -> Result<Vec<Job>> {
        self.list_pipeline_jobs(run_id).await
    }

    async fn start_job(&self, job_id: u64) -> Result<Job> {
        self.play_job(job_id).await
    }
}

/// Parses the instance root, which endpoint paths are appended to
fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl(format!(
            "{}: scheme must be http or https",
            raw
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::InvalidUrl(format!("{}: missing host", raw)));
    }

    Ok(url)
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal fake GitLab API served on a local port

    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral port and returns its base URL
    pub async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}
