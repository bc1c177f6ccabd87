//! Deployer Orchestrator
//!
//! Drives the trigger API for every resolved unit: create a pipeline run,
//! list its jobs, start the job named `deploy`.
//!
//! Units are deployed one after the other by default and the first failure
//! stops the remaining units. `OrchestrationPolicy` can switch to
//! continue-on-error and allow several units in flight at once; the three
//! calls of a single unit always stay in order.

pub mod error;
pub mod outcome;
pub mod service;
pub mod settings;

pub use error::DeployError;
pub use outcome::{DeploySummary, Deployment, UnitOutcome};
pub use service::DeploymentOrchestrator;
pub use settings::{JobLink, OrchestrationPolicy, OrchestratorSettings};
pub use tokio_util::sync::CancellationToken;
