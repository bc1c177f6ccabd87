//! Deployment outcomes

use deployer_core::domain::pipeline::ResolvedUnit;

use crate::error::DeployError;

/// A unit whose deploy job was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub unit: ResolvedUnit,
    pub run_id: u64,
    pub job_id: u64,
    /// Link to follow the job's progress
    pub job_url: String,
}

/// Result of deploying one unit
#[derive(Debug)]
pub struct UnitOutcome {
    pub unit: ResolvedUnit,
    pub result: Result<Deployment, DeployError>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of an orchestration pass, in resolution order
#[derive(Debug, Default)]
pub struct DeploySummary {
    /// Units that were attempted
    pub outcomes: Vec<UnitOutcome>,
    /// Units never attempted because the pass stopped early
    pub skipped: Vec<ResolvedUnit>,
}

impl DeploySummary {
    /// Every unit was attempted and succeeded
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(UnitOutcome::is_success)
    }

    pub fn deployments(&self) -> impl Iterator<Item = &Deployment> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeployError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn first_error(&self) -> Option<&DeployError> {
        self.failures().next()
    }

    /// Takes ownership of the first error
    pub fn into_first_error(self) -> Option<DeployError> {
        self.outcomes.into_iter().find_map(|o| o.result.err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(unit: &ResolvedUnit) -> Deployment {
        Deployment {
            unit: unit.clone(),
            run_id: 1,
            job_id: 2,
            job_url: "https://gitlab.com/acme/infra/-/jobs/2".to_string(),
        }
    }

    #[test]
    fn test_empty_summary_is_success() {
        assert!(DeploySummary::default().is_success());
    }

    #[test]
    fn test_skipped_units_fail_the_summary() {
        let unit = ResolvedUnit::new("client1", None);
        let summary = DeploySummary {
            outcomes: vec![UnitOutcome {
                unit: unit.clone(),
                result: Ok(deployment(&unit)),
            }],
            skipped: vec![ResolvedUnit::new("client3", None)],
        };
        assert!(!summary.is_success());
        assert_eq!(summary.deployments().count(), 1);
        assert!(summary.first_error().is_none());
    }

    #[test]
    fn test_first_error() {
        let a = ResolvedUnit::new("client1", None);
        let b = ResolvedUnit::new("client3", None);
        let summary = DeploySummary {
            outcomes: vec![
                UnitOutcome {
                    unit: a.clone(),
                    result: Ok(deployment(&a)),
                },
                UnitOutcome {
                    unit: b.clone(),
                    result: Err(DeployError::Cancelled { unit: b.clone() }),
                },
            ],
            skipped: Vec::new(),
        };

        assert!(!summary.is_success());
        assert_eq!(summary.failures().count(), 1);
        assert_eq!(summary.first_error().map(|e| e.unit()), Some(&b));
        assert!(summary.into_first_error().is_some_and(|e| e.is_cancelled()));
    }
}
