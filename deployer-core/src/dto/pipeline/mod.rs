//! Pipeline DTOs for the trigger API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::pipeline::ResolvedUnit;

/// Variable carrying the unit identifier into the pipeline
pub const CLIENT_ID_VARIABLE: &str = "client_id";

/// Variable carrying the requested application into the pipeline
pub const APP_NAME_VARIABLE: &str = "app_name";

/// Request to create a new pipeline run for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRun {
    pub client_id: String,
    pub app_name: Option<String>,
}

impl CreateRun {
    /// Builds the request for a resolved unit
    pub fn for_unit(unit: &ResolvedUnit) -> Self {
        Self {
            client_id: unit.unit_id.clone(),
            app_name: unit.app_name.clone(),
        }
    }

    /// Pipeline variables for this run
    ///
    /// `app_name` is only present when an application was requested.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut variables = BTreeMap::new();
        variables.insert(CLIENT_ID_VARIABLE.to_string(), self.client_id.clone());
        if let Some(app) = self.app_name.as_deref().filter(|a| !a.is_empty()) {
            variables.insert(APP_NAME_VARIABLE.to_string(), app.to_string());
        }
        variables
    }
}
