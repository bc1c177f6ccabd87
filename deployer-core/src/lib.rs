//! Deployer Core
//!
//! Core types and logic shared by the deployer crates.
//!
//! This crate contains:
//! - Domain types: manifest records, selectors, resolved units, pipeline runs and jobs
//! - Resolver: turns a selector into the ordered list of units to deploy
//! - DTOs: data sent to the trigger API

pub mod domain;
pub mod dto;
pub mod resolver;

pub use domain::manifest::{Manifest, ManifestError, ManifestRecord};
pub use domain::pipeline::{DEPLOY_JOB_NAME, Job, PipelineRun, ResolvedUnit};
pub use domain::selector::{Selector, WILDCARD_CLIENT};
pub use resolver::{MatchStrategy, ResolveError, Resolver, resolve};
