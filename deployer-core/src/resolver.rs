//! Target resolver
//!
//! Turns a `Selector` into the ordered list of units to deploy. Records are
//! scanned in manifest order and comment records are never considered.
//!
//! Resolution tracks two things separately: whether any record matched the
//! client, and which of those also matched the application. A client that
//! exists but lacks the application reports `ApplicationNotFound`, a client
//! that does not exist at all reports `ClientNotFound`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::manifest::{Manifest, ManifestRecord};
use crate::domain::pipeline::ResolvedUnit;
use crate::domain::selector::Selector;

/// Errors raised while resolving a selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No active record matched the client
    #[error("client {client_id} has not been found in {manifest}")]
    ClientNotFound { client_id: String, manifest: String },

    /// Wildcard selector, but no record carries the application
    #[error("no application has been found (looking for {app_name})")]
    NoApplicationFound { app_name: String },

    /// The client exists but none of its records carry the application
    #[error("application {app_name} is not set for client {client_id} in {manifest}")]
    ApplicationNotFound {
        app_name: String,
        client_id: String,
        manifest: String,
    },
}

impl ResolveError {
    pub fn is_client_not_found(&self) -> bool {
        matches!(self, Self::ClientNotFound { .. })
    }

    /// True for both the wildcard and the single-client variant
    pub fn is_application_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoApplicationFound { .. } | Self::ApplicationNotFound { .. }
        )
    }
}

/// How selector values are compared against manifest records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Client and application match when the raw line contains them.
    ///
    /// Compatible with existing manifests, but loose: `1` matches `client1`,
    /// `client10`, ...
    #[default]
    SubstringContains,
    /// Client must equal field 0, application must equal one of the other fields
    ExactField,
}

impl MatchStrategy {
    fn client_matches(self, record: &ManifestRecord, client_id: &str) -> bool {
        match self {
            Self::SubstringContains => record.raw_line.contains(client_id),
            Self::ExactField => record.unit_id().trim() == client_id,
        }
    }

    fn app_matches(self, record: &ManifestRecord, app_name: &str) -> bool {
        match self {
            Self::SubstringContains => record.raw_line.contains(app_name),
            Self::ExactField => record.trailing_fields().iter().any(|f| f.trim() == app_name),
        }
    }
}

/// Resolves selectors against a manifest
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    strategy: MatchStrategy,
}

impl Resolver {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self { strategy }
    }

    /// Resolves a selector into units, in manifest order
    ///
    /// Records producing the same unit id are all kept, one unit per record.
    ///
    /// # Errors
    /// - `ClientNotFound` if no active record matched the client
    /// - `NoApplicationFound` / `ApplicationNotFound` if the client matched but
    ///   the application filter left nothing
    pub fn resolve(
        &self,
        manifest: &Manifest,
        selector: &Selector,
    ) -> Result<Vec<ResolvedUnit>, ResolveError> {
        let mut client_found = false;
        let mut units = Vec::new();

        for record in manifest.active_records() {
            if !selector.is_wildcard() && !self.strategy.client_matches(record, &selector.client_id)
            {
                continue;
            }
            client_found = true;

            if let Some(app) = selector.app() {
                if !self.strategy.app_matches(record, app) {
                    continue;
                }
            }

            debug!(
                "Selected {} for {} (line {}: {})",
                record.unit_id(),
                selector,
                record.line_number,
                record.raw_line
            );
            units.push(ResolvedUnit::new(
                record.unit_id(),
                selector.app_name.clone(),
            ));
        }

        if !client_found {
            return Err(ResolveError::ClientNotFound {
                client_id: selector.client_id.clone(),
                manifest: manifest.source.clone(),
            });
        }

        if units.is_empty() {
            // Only reachable with an application filter: without one every
            // client match is selected.
            let app_name = selector.app().unwrap_or_default().to_string();
            return Err(if selector.is_wildcard() {
                ResolveError::NoApplicationFound { app_name }
            } else {
                ResolveError::ApplicationNotFound {
                    app_name,
                    client_id: selector.client_id.clone(),
                    manifest: manifest.source.clone(),
                }
            });
        }

        Ok(units)
    }
}

/// Resolves with the default `SubstringContains` strategy
pub fn resolve(manifest: &Manifest, selector: &Selector) -> Result<Vec<ResolvedUnit>, ResolveError> {
    Resolver::default().resolve(manifest, selector)
}
