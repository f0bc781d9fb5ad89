//! Polling of export jobs until they finish

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::JobsConfig;
use crate::error::{reports_existing_asset, PipelineError, Result};
use crate::jobs::{JobHandle, JobService, JobStatus};

/// Outcome of a tracking run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackReport {
    /// Jobs that completed
    pub completed: Vec<String>,
    /// Jobs whose asset already existed
    pub skipped: Vec<String>,
}

/// Round-robin tracker for a named set of jobs.
///
/// All jobs are polled in turn from the calling thread, then the tracker
/// sleeps for `poll_interval`. A status call failing with a transport error
/// is retried once after `retry_delay`.
#[derive(Debug, Clone, Copy)]
pub struct JobTracker {
    poll_interval: Duration,
    retry_delay: Duration,
}

impl JobTracker {
    pub fn new(poll_interval: Duration, retry_delay: Duration) -> Self {
        Self {
            poll_interval,
            retry_delay,
        }
    }

    pub fn from_config(config: &JobsConfig) -> Self {
        Self::new(config.poll_interval(), config.retry_delay())
    }

    /// Wait for every job to finish.
    ///
    /// Returns at the first cancelled or failed job. A failure reporting an
    /// existing asset counts as skipped.
    pub fn track(
        &self,
        service: &dyn JobService,
        jobs: Vec<(String, JobHandle)>,
    ) -> Result<TrackReport> {
        let mut report = TrackReport::default();
        let mut pending = jobs;
        let start = Instant::now();
        info!(count = pending.len(), "tracking export jobs");

        while !pending.is_empty() {
            let minutes = start.elapsed().as_secs() / 60;
            let mut running = Vec::with_capacity(pending.len());
            for (name, handle) in pending {
                match self.status_with_retry(service, &name, &handle)? {
                    JobStatus::Completed => {
                        info!(job = %name, minutes, "job completed");
                        report.completed.push(name);
                    }
                    JobStatus::Cancelled => {
                        error!(job = %name, "job cancelled");
                        return Err(PipelineError::JobCancelled(name));
                    }
                    JobStatus::Failed(message) if reports_existing_asset(&message) => {
                        info!(job = %name, "asset already exists, skipping");
                        report.skipped.push(name);
                    }
                    JobStatus::Failed(message) => {
                        error!(job = %name, %message, "job failed");
                        return Err(PipelineError::JobFailed { job: name, message });
                    }
                    JobStatus::Pending | JobStatus::Running => running.push((name, handle)),
                }
            }
            pending = running;
            if !pending.is_empty() {
                debug!(running = pending.len(), minutes, "jobs still running");
                thread::sleep(self.poll_interval);
            }
        }

        info!(
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            "all jobs finished"
        );
        Ok(report)
    }

    fn status_with_retry(
        &self,
        service: &dyn JobService,
        name: &str,
        handle: &JobHandle,
    ) -> Result<JobStatus> {
        match service.status(handle) {
            Err(e) if e.is_transient() => {
                warn!(job = %name, error = %e, "status request failed, retrying");
                thread::sleep(self.retry_delay);
                service.status(handle).map_err(|e| match e {
                    PipelineError::Transport(message) => {
                        error!(job = %name, %message, "status request failed again");
                        PipelineError::Transport(format!("job '{name}': {message}"))
                    }
                    other => other,
                })
            }
            other => other,
        }
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::from_config(&JobsConfig::default())
    }
}
