//! Service layer
//!
//! The orchestrator only talks to the remote system through the
//! `PipelineClient` trait, so tests run it against an in-memory fake.

mod deployment;

pub use deployment::DeploymentOrchestrator;

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory `PipelineClient` recording every call

    use async_trait::async_trait;
    use deployer_client::{ClientError, PipelineClient, Result};
    use deployer_core::domain::pipeline::{Job, PipelineRun};
    use deployer_core::dto::pipeline::CreateRun;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        CreateRun(String, Option<String>),
        ListJobs(u64),
        StartJob(u64),
    }

    /// Fake trigger API
    ///
    /// Runs are numbered from 100; job ids are `run_id * 10 + position`,
    /// starting at 1. By default every run has a `build` and a `deploy` job.
    pub struct FakeClient {
        calls: Mutex<Vec<Call>>,
        next_run: AtomicU64,
        job_names: Vec<String>,
        fail_create: HashSet<String>,
        fail_list: bool,
        fail_start: bool,
        hang_on_start: bool,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Default for FakeClient {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_run: AtomicU64::new(100),
                job_names: vec!["build".to_string(), "deploy".to_string()],
                fail_create: HashSet::new(),
                fail_list: false,
                fail_start: false,
                hang_on_start: false,
                delay: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl FakeClient {
        pub fn with_job_names(mut self, names: &[&str]) -> Self {
            self.job_names = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn fail_create_for(mut self, unit_id: &str) -> Self {
            self.fail_create.insert(unit_id.to_string());
            self
        }

        pub fn fail_list(mut self) -> Self {
            self.fail_list = true;
            self
        }

        pub fn fail_start(mut self) -> Self {
            self.fail_start = true;
            self
        }

        pub fn hang_on_start(mut self) -> Self {
            self.hang_on_start = true;
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        /// Most calls observed running at the same time
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        async fn enter(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }

        fn leave(&self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PipelineClient for FakeClient {
        async fn create_run(&self, req: &CreateRun) -> Result<PipelineRun> {
            self.enter(Call::CreateRun(req.client_id.clone(), req.app_name.clone()))
                .await;
            self.leave();

            if self.fail_create.contains(&req.client_id) {
                return Err(ClientError::api_error(500, "500 Internal Server Error"));
            }
            Ok(PipelineRun::new(self.next_run.fetch_add(1, Ordering::SeqCst)))
        }

        async fn list_jobs(&self, run_id: u64) -> Result<Vec<Job>> {
            self.enter(Call::ListJobs(run_id)).await;
            self.leave();

            if self.fail_list {
                return Err(ClientError::ParseError("truncated body".to_string()));
            }
            Ok(self
                .job_names
                .iter()
                .enumerate()
                .map(|(i, name)| Job::new(run_id * 10 + i as u64 + 1, name.as_str()))
                .collect())
        }

        async fn start_job(&self, job_id: u64) -> Result<Job> {
            self.enter(Call::StartJob(job_id)).await;
            if self.hang_on_start {
                std::future::pending::<()>().await;
            }
            self.leave();

            if self.fail_start {
                return Err(ClientError::api_error(403, "403 Forbidden"));
            }
            Ok(Job::new(job_id, "deploy"))
        }
    }
}
