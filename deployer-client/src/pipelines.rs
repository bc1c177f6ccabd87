//! Pipeline trigger endpoint

use crate::GitlabClient;
use crate::error::Result;
use deployer_core::domain::pipeline::PipelineRun;
use deployer_core::dto::pipeline::CreateRun;
use tracing::debug;

impl GitlabClient {
    // =============================================================================
    // Pipeline Triggers
    // =============================================================================

    /// Trigger a new pipeline run
    ///
    /// Every job of the project's CI configuration is created for the run;
    /// the request variables are exposed to them.
    ///
    /// # Arguments
    /// * `req` - The unit to build the pipeline for
    ///
    /// # Returns
    /// The created pipeline run
    pub async fn trigger_pipeline(&self, req: &CreateRun) -> Result<PipelineRun> {
        let url = self.endpoint(&["trigger", "pipeline"]);
        let form = self.trigger_form(req);

        debug!(
            "Triggering pipeline on {} for {}",
            self.settings.git_ref, req.client_id
        );
        let response = self.client.post(url).form(&form).send().await?;

        self.handle_response(response).await
    }

    /// Form fields of a trigger request
    fn trigger_form(&self, req: &CreateRun) -> Vec<(String, String)> {
        let mut form = vec![
            ("token".to_string(), self.settings.trigger_token.clone()),
            ("ref".to_string(), self.settings.git_ref.clone()),
        ];
        form.extend(
            req.variables()
                .into_iter()
                .map(|(key, value)| (format!("variables[{}]", key), value)),
        );
        form
    }
}
