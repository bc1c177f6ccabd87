//! Deployment errors
//!
//! One variant per stage of the trigger protocol, each carrying the unit it
//! happened on and the ids known at that point.

use deployer_client::ClientError;
use deployer_core::domain::pipeline::ResolvedUnit;
use thiserror::Error;

/// Errors raised while deploying a single unit
#[derive(Debug, Error)]
pub enum DeployError {
    /// The pipeline run could not be created
    #[error("wasn't able to create the pipeline for {unit}")]
    RunCreationFailed {
        unit: ResolvedUnit,
        #[source]
        source: ClientError,
    },

    /// The jobs of the run could not be listed
    #[error("wasn't able to list jobs of pipeline {run_id} for {unit}")]
    JobListingFailed {
        unit: ResolvedUnit,
        run_id: u64,
        #[source]
        source: ClientError,
    },

    /// The run has no job with the expected name
    #[error("pipeline {run_id} for {unit} has no job named {job_name}")]
    DeployJobNotFound {
        unit: ResolvedUnit,
        run_id: u64,
        job_name: String,
    },

    /// The job was found but could not be started
    #[error("wasn't able to play job {job_name} id {job_id} on pipeline {run_id} for {unit}")]
    JobStartFailed {
        unit: ResolvedUnit,
        job_name: String,
        job_id: u64,
        run_id: u64,
        #[source]
        source: ClientError,
    },

    /// Deployment stopped before completing
    #[error("deployment of {unit} was cancelled")]
    Cancelled { unit: ResolvedUnit },

    /// The task deploying the unit did not finish
    #[error("deployment task for {unit} failed: {message}")]
    TaskFailed { unit: ResolvedUnit, message: String },
}

impl DeployError {
    /// Unit the error happened on
    pub fn unit(&self) -> &ResolvedUnit {
        match self {
            Self::RunCreationFailed { unit, .. }
            | Self::JobListingFailed { unit, .. }
            | Self::DeployJobNotFound { unit, .. }
            | Self::JobStartFailed { unit, .. }
            | Self::Cancelled { unit }
            | Self::TaskFailed { unit, .. } => unit,
        }
    }

    /// Remote error behind the failure, if any
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::RunCreationFailed { source, .. }
            | Self::JobListingFailed { source, .. }
            | Self::JobStartFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
