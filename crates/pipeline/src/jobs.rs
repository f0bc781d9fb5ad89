//! Export jobs
//!
//! Persisting a product is a long-running job behind [`JobService`]: it is
//! submitted once and then polled by the [`JobTracker`](crate::JobTracker).
//! [`export`] guards submission with the store's existence check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::assets::{Asset, AssetId, AssetStore};
use crate::error::{PipelineError, Result};

/// Product to persist under an id
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub asset_id: AssetId,
    pub asset: Asset,
}

impl ExportRequest {
    pub fn new(asset_id: AssetId, asset: Asset) -> Self {
        Self { asset_id, asset }
    }
}

/// Reference to a submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: u64,
    pub asset_id: AssetId,
}

/// State of a job as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    /// Remote error message
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// Asynchronous export backend
pub trait JobService: Send + Sync {
    fn submit(&self, request: ExportRequest) -> Result<JobHandle>;

    /// Current state; transport problems are [`PipelineError::Transport`]
    fn status(&self, handle: &JobHandle) -> Result<JobStatus>;
}

/// Result of a guarded export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Submitted(JobHandle),
    /// The asset already existed and overwriting is off
    Skipped(AssetId),
}

impl ExportOutcome {
    pub fn job(&self) -> Option<&JobHandle> {
        match self {
            ExportOutcome::Submitted(job) => Some(job),
            ExportOutcome::Skipped(_) => None,
        }
    }
}

/// Submit `request` unless its asset exists.
///
/// With `overwrite` the existing asset is deleted and the export resubmitted
/// (last writer wins). Without it the export is skipped (first writer wins).
pub fn export(
    store: &dyn AssetStore,
    jobs: &dyn JobService,
    request: ExportRequest,
    overwrite: bool,
) -> Result<ExportOutcome> {
    let id = request.asset_id.clone();
    if store.exists(&id)? {
        if !overwrite {
            info!(asset = %id, "asset already exists, skipping");
            return Ok(ExportOutcome::Skipped(id));
        }
        info!(asset = %id, "overwriting existing asset");
        store.delete(&id)?;
    }
    let handle = jobs.submit(request)?;
    debug!(asset = %id, job = handle.id, "export submitted");
    Ok(ExportOutcome::Submitted(handle))
}

/// Runs exports synchronously into a store on submission
pub struct LocalJobService {
    store: Arc<dyn AssetStore>,
    next_id: AtomicU64,
    submissions: AtomicUsize,
    statuses: Mutex<HashMap<u64, JobStatus>>,
}

impl LocalJobService {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            submissions: AtomicUsize::new(0),
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Number of jobs submitted so far
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LocalJobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalJobService")
            .field("submissions", &self.submissions())
            .finish_non_exhaustive()
    }
}

impl JobService for LocalJobService {
    fn submit(&self, request: ExportRequest) -> Result<JobHandle> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let status = match self.store.put(&request.asset_id, request.asset) {
            Ok(()) => JobStatus::Completed,
            Err(e) => JobStatus::Failed(e.to_string()),
        };
        self.statuses
            .lock()
            .map_err(|_| PipelineError::Transport("job table lock poisoned".into()))?
            .insert(id, status);
        Ok(JobHandle {
            id,
            asset_id: request.asset_id,
        })
    }

    fn status(&self, handle: &JobHandle) -> Result<JobStatus> {
        self.statuses
            .lock()
            .map_err(|_| PipelineError::Transport("job table lock poisoned".into()))?
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| PipelineError::Transport(format!("unknown job {}", handle.id)))
    }
}
