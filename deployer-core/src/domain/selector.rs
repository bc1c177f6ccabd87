//! Selector domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Client id that selects every active manifest record
pub const WILDCARD_CLIENT: &str = "all";

/// What the operator asked to deploy: a client and, optionally, one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub client_id: String,
    pub app_name: Option<String>,
}

impl Selector {
    /// Creates a selector; an empty application name means "every application"
    pub fn new(client_id: impl Into<String>, app_name: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            app_name: app_name.filter(|a| !a.is_empty()),
        }
    }

    /// Selector for every application of every client
    pub fn all() -> Self {
        Self::new(WILDCARD_CLIENT, None)
    }

    /// Adds an application filter
    pub fn with_app(mut self, app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        self.app_name = (!app_name.is_empty()).then_some(app_name);
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.client_id == WILDCARD_CLIENT
    }

    pub fn app(&self) -> Option<&str> {
        self.app_name.as_deref()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.app_name {
            Some(app) => write!(f, "{}/{}", self.client_id, app),
            None => write!(f, "{}", self.client_id),
        }
    }
}
