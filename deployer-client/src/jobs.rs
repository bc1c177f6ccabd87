//! Job endpoints

use crate::error::{ClientError, Result};
use crate::{GitlabClient, PRIVATE_TOKEN_HEADER};
use deployer_core::domain::pipeline::Job;
use tracing::{debug, warn};

/// Page size requested when listing jobs (GitLab's maximum)
const JOBS_PER_PAGE: u32 = 100;

/// Upper bound on pages fetched for one run
const MAX_PAGES: u32 = 50;

/// Response header holding the next page number, empty on the last page
const NEXT_PAGE_HEADER: &str = "x-next-page";

impl GitlabClient {
    // =============================================================================
    // Jobs
    // =============================================================================

    /// List all jobs of a pipeline run
    ///
    /// Follows pagination until the last page.
    ///
    /// # Arguments
    /// * `pipeline_id` - The pipeline run id
    pub async fn list_pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<Job>> {
        let pipeline = pipeline_id.to_string();
        let url = self.endpoint(&["pipelines", &pipeline, "jobs"]);
        let mut jobs = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .client
                .get(url.clone())
                .header(PRIVATE_TOKEN_HEADER, &self.settings.private_token)
                .query(&[("per_page", JOBS_PER_PAGE), ("page", page)])
                .send()
                .await?;
            let response = self.check_status(response).await?;

            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let batch: Vec<Job> = response.json().await.map_err(|e| {
                ClientError::ParseError(format!("Failed to parse job list: {}", e))
            })?;
            debug!(
                "Pipeline {} page {}: {} job(s)",
                pipeline_id,
                page,
                batch.len()
            );
            jobs.extend(batch);

            match next_page {
                Some(next) if next > page && next <= MAX_PAGES => page = next,
                Some(next) if next > page => {
                    warn!(
                        "Pipeline {} has more than {} pages of jobs, ignoring page {} onwards",
                        pipeline_id, MAX_PAGES, next
                    );
                    break;
                }
                _ => break,
            }
        }

        Ok(jobs)
    }

    /// Play a manual job
    ///
    /// # Arguments
    /// * `job_id` - The job to start
    ///
    /// # Returns
    /// The job as reported after starting it
    pub async fn play_job(&self, job_id: u64) -> Result<Job> {
        let job = job_id.to_string();
        let url = self.endpoint(&["jobs", &job, "play"]);
        let response = self
            .client
            .post(url)
            .header(PRIVATE_TOKEN_HEADER, &self.settings.private_token)
            .send()
            .await?;

        self.handle_response(response).await
    }
}
