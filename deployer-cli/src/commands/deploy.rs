//! Deploy command handler
//!
//! Resolves the requested units from the client manifest, then triggers the
//! deployment pipeline for each of them.

use anyhow::{Result, anyhow, bail};
use clap::Args;
use colored::*;
use deployer_client::{GitlabClient, PipelineClient};
use deployer_core::domain::manifest::Manifest;
use deployer_core::domain::pipeline::ResolvedUnit;
use deployer_core::domain::selector::Selector;
use deployer_core::resolver::{MatchStrategy, Resolver};
use deployer_orchestrator::{
    CancellationToken, DeploySummary, DeploymentOrchestrator, OrchestrationPolicy,
    OrchestratorSettings,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;

/// Upper bound accepted for `--concurrency`
const MAX_CONCURRENCY: i64 = 64;

/// Arguments of `deployer deploy`
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Client id, or `all` for every client
    pub client_id: String,

    /// Application to deploy (every application of the client when omitted)
    pub app_name: Option<String>,

    /// Keep deploying the remaining units after a failure
    #[arg(long)]
    pub continue_on_error: bool,

    /// Number of units deployed at the same time
    #[arg(
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u16).range(1..=MAX_CONCURRENCY)
    )]
    pub concurrency: u16,

    /// Match client id and application against whole manifest fields
    #[arg(long)]
    pub exact: bool,

    /// Show the units that would be deployed without triggering anything
    #[arg(long)]
    pub dry_run: bool,
}

impl DeployArgs {
    fn selector(&self) -> Selector {
        Selector::new(&self.client_id, self.app_name.clone())
    }

    fn strategy(&self) -> MatchStrategy {
        if self.exact {
            MatchStrategy::ExactField
        } else {
            MatchStrategy::SubstringContains
        }
    }

    fn policy(&self) -> OrchestrationPolicy {
        OrchestrationPolicy::default()
            .continue_on_error(self.continue_on_error)
            .with_concurrency(usize::from(self.concurrency))
    }
}

/// Handle the deploy command
pub async fn handle_deploy_command(args: DeployArgs, config: &Config) -> Result<()> {
    let client = Arc::new(GitlabClient::new(config.gitlab_settings())?);
    deploy(args, config, client).await
}

/// Resolves and deploys using the given trigger API
async fn deploy(args: DeployArgs, config: &Config, client: Arc<dyn PipelineClient>) -> Result<()> {
    info!("Deploying {} requested", args.selector());

    let units = resolve_units(&args, config)?;

    if args.dry_run {
        print_units(&units);
        return Ok(());
    }

    let settings = OrchestratorSettings::new(config.job_link()).with_policy(args.policy());
    let orchestrator = DeploymentOrchestrator::new(client, settings);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling deployments");
                cancel.cancel();
            }
        })
    };

    let summary = orchestrator.run(&units, &cancel).await;
    interrupt.abort();

    print_summary(&summary);
    into_result(summary, units.len())
}

/// Loads the manifest and resolves the selector against it
fn resolve_units(args: &DeployArgs, config: &Config) -> Result<Vec<ResolvedUnit>> {
    let manifest = Manifest::load(&config.client_file)?;
    let units = Resolver::new(args.strategy()).resolve(&manifest, &args.selector())?;

    info!(
        "{} unit(s) resolved from {}",
        units.len(),
        config.client_file.display()
    );
    Ok(units)
}

/// Turns a summary into the command's result
fn into_result(summary: DeploySummary, total: usize) -> Result<()> {
    if summary.is_success() {
        return Ok(());
    }

    let failed = summary.failures().count();
    let skipped = summary.skipped.len();
    let headline = format!(
        "{} of {} deployment(s) failed, {} not attempted",
        failed, total, skipped
    );

    match summary.into_first_error() {
        Some(err) => Err(anyhow!(err).context(headline)),
        None => bail!(headline),
    }
}

/// Print the units a deployment would trigger
fn print_units(units: &[ResolvedUnit]) {
    println!(
        "{}",
        format!("{} unit(s) would be deployed:", units.len()).bold()
    );
    for unit in units {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            unit.unit_id.bold(),
            unit.app_name.as_deref().unwrap_or("all applications").dimmed()
        );
    }
}

/// Print the outcome of every unit
fn print_summary(summary: &DeploySummary) {
    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(deployment) => {
                println!(
                    "{}",
                    format!("✓ Job launched for {}", deployment.unit)
                        .green()
                        .bold()
                );
                println!("  Pipeline: {}", deployment.run_id.to_string().cyan());
                println!("  Progress: {}", deployment.job_url);
            }
            Err(err) => {
                println!("{} {}", "✗".red().bold(), err.to_string().red());
                if let Some(cause) = err.client_error() {
                    println!("  {}", cause.to_string().dimmed());
                }
            }
        }
    }

    for unit in &summary.skipped {
        println!("{} {} (not deployed)", "-".yellow(), unit.to_string().yellow());
    }
}
