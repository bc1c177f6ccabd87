//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the job started in every pipeline run
pub const DEPLOY_JOB_NAME: &str = "deploy";

/// One concrete deployable target produced by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUnit {
    /// Value passed to the pipeline as `client_id`
    pub unit_id: String,
    /// Application requested by the selector, not parsed from the manifest
    pub app_name: Option<String>,
}

impl ResolvedUnit {
    pub fn new(unit_id: impl Into<String>, app_name: Option<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            app_name,
        }
    }
}

impl fmt::Display for ResolvedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.app_name {
            Some(app) => write!(f, "{}/{}", self.unit_id, app),
            None => write!(f, "{}", self.unit_id),
        }
    }
}

/// Pipeline run created by the trigger API
///
/// Only the id is required; the remaining fields are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl PipelineRun {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            status: None,
            git_ref: None,
            web_url: None,
        }
    }
}

/// Job belonging to a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl Job {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            stage: None,
            status: None,
            web_url: None,
        }
    }

    /// Picks the job named `name` from a run's job list
    ///
    /// When several jobs share the name the last one listed wins.
    pub fn find_named<'a>(jobs: &'a [Job], name: &str) -> Option<&'a Job> {
        jobs.iter().rev().find(|job| job.name == name)
    }
}
