//! Deployment orchestrator
//!
//! For each unit: create a pipeline run, list its jobs, pick the deploy job
//! and start it. Nothing is retried.

use deployer_client::PipelineClient;
use deployer_core::domain::pipeline::{Job, ResolvedUnit};
use deployer_core::dto::pipeline::CreateRun;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DeployError;
use crate::outcome::{DeploySummary, Deployment, UnitOutcome};
use crate::settings::OrchestratorSettings;

/// Runs the trigger protocol for resolved units
#[derive(Clone)]
pub struct DeploymentOrchestrator {
    client: Arc<dyn PipelineClient>,
    settings: OrchestratorSettings,
}

impl DeploymentOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    /// * `client` - Trigger API the runs are created on
    /// * `settings` - Job name, link format and orchestration policy
    pub fn new(client: Arc<dyn PipelineClient>, settings: OrchestratorSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Deploys every unit according to the policy
    ///
    /// Outcomes are reported in the order of `units`. Unless
    /// `continue_on_error` is set, the first failure stops the pass and the
    /// units not yet started are reported as skipped.
    pub async fn run(&self, units: &[ResolvedUnit], cancel: &CancellationToken) -> DeploySummary {
        let policy = self.settings.policy;
        info!(
            "Deploying {} unit(s) (concurrency: {}, continue on error: {})",
            units.len(),
            policy.max_concurrency,
            policy.continue_on_error
        );

        if policy.is_sequential() {
            self.run_sequential(units, cancel).await
        } else {
            self.run_concurrent(units, cancel).await
        }
    }

    async fn run_sequential(
        &self,
        units: &[ResolvedUnit],
        cancel: &CancellationToken,
    ) -> DeploySummary {
        let mut summary = DeploySummary::default();

        for (index, unit) in units.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Cancelled, {} unit(s) not deployed", units.len() - index);
                summary.skipped.extend_from_slice(&units[index..]);
                break;
            }

            let result = self.deploy_unit(unit, cancel).await;
            let failed = result.is_err();
            summary.outcomes.push(UnitOutcome {
                unit: unit.clone(),
                result,
            });

            if failed && !self.settings.policy.continue_on_error {
                let remaining = &units[index + 1..];
                if !remaining.is_empty() {
                    warn!(
                        "Deployment of {} failed, {} unit(s) not deployed",
                        unit,
                        remaining.len()
                    );
                }
                summary.skipped.extend_from_slice(remaining);
                break;
            }
        }

        summary
    }

    async fn run_concurrent(
        &self,
        units: &[ResolvedUnit],
        cancel: &CancellationToken,
    ) -> DeploySummary {
        // Fields are public, so the limit may not have gone through `with_concurrency`
        let permits = self
            .settings
            .policy
            .max_concurrency
            .min(units.len())
            .clamp(1, Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));
        // Cancelled on the first failure when aborting, without touching the caller's token
        let abort = cancel.child_token();
        let continue_on_error = self.settings.policy.continue_on_error;

        let mut summary = DeploySummary::default();
        let mut handles = Vec::with_capacity(units.len());

        for (index, unit) in units.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = abort.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit.filter(|_| !abort.is_cancelled()) else {
                warn!("Stopping, {} unit(s) not deployed", units.len() - index);
                summary.skipped.extend_from_slice(&units[index..]);
                break;
            };

            let orchestrator = self.clone();
            let token = abort.clone();
            let task_unit = unit.clone();
            let handle = tokio::spawn(async move {
                let result = orchestrator.deploy_unit(&task_unit, &token).await;
                if result.is_err() && !continue_on_error {
                    token.cancel();
                }
                // Permit is released when dropped
                drop(permit);
                result
            });
            handles.push((unit.clone(), handle));
        }

        for (unit, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Deployment task for {} panicked: {}", unit, e);
                    Err(DeployError::TaskFailed {
                        unit: unit.clone(),
                        message: e.to_string(),
                    })
                }
            };
            summary.outcomes.push(UnitOutcome { unit, result });
        }

        summary
    }

    /// Deploys a single unit
    ///
    /// # Errors
    /// - `RunCreationFailed`, `JobListingFailed`, `JobStartFailed` when the
    ///   matching remote call fails
    /// - `DeployJobNotFound` when the run has no job with the configured name
    /// - `Cancelled` when `cancel` fires before the sequence completes
    pub async fn deploy_unit(
        &self,
        unit: &ResolvedUnit,
        cancel: &CancellationToken,
    ) -> Result<Deployment, DeployError> {
        info!("Deploying {}", unit);
        let job_name = self.settings.job_name.as_str();

        let req = CreateRun::for_unit(unit);
        let run = cancellable(unit, cancel, self.client.create_run(&req))
            .await?
            .map_err(|source| DeployError::RunCreationFailed {
                unit: unit.clone(),
                source,
            })?;
        debug!("Created pipeline {} for {}", run.id, unit);

        let jobs = cancellable(unit, cancel, self.client.list_jobs(run.id))
            .await?
            .map_err(|source| DeployError::JobListingFailed {
                unit: unit.clone(),
                run_id: run.id,
                source,
            })?;
        debug!("Pipeline {} has {} job(s)", run.id, jobs.len());

        let job_id = Job::find_named(&jobs, job_name)
            .map(|job| job.id)
            .ok_or_else(|| DeployError::DeployJobNotFound {
                unit: unit.clone(),
                run_id: run.id,
                job_name: job_name.to_string(),
            })?;

        cancellable(unit, cancel, self.client.start_job(job_id))
            .await?
            .map_err(|source| DeployError::JobStartFailed {
                unit: unit.clone(),
                job_name: job_name.to_string(),
                job_id,
                run_id: run.id,
                source,
            })?;

        let job_url = self.settings.job_link.job_url(job_id);
        info!("Job successfully launched ({})", unit);
        info!("Job progression: {}", job_url);

        Ok(Deployment {
            unit: unit.clone(),
            run_id: run.id,
            job_id,
            job_url,
        })
    }
}

/// Races a remote call against cancellation
async fn cancellable<T>(
    unit: &ResolvedUnit,
    cancel: &CancellationToken,
    call: impl Future<Output = T>,
) -> Result<T, DeployError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled { unit: unit.clone() }),
        output = call => Ok(output),
    }
}
