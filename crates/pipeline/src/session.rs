//! Explicit pipeline context

use std::sync::Arc;

use crate::assets::{Asset, AssetId, AssetStore, InMemoryStore};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::jobs::{export, ExportOutcome, ExportRequest, JobService, LocalJobService};
use crate::tracker::JobTracker;

/// Configuration, asset store and job service of one pipeline run.
///
/// Every entry point takes a `&Session`; nothing is read from globals.
#[derive(Clone)]
pub struct Session {
    config: PipelineConfig,
    store: Arc<dyn AssetStore>,
    jobs: Arc<dyn JobService>,
}

impl Session {
    pub fn new(config: PipelineConfig, store: Arc<dyn AssetStore>, jobs: Arc<dyn JobService>) -> Self {
        Self { config, store, jobs }
    }

    /// In-memory store with jobs that export on submission
    pub fn local(config: PipelineConfig) -> Self {
        let store: Arc<dyn AssetStore> = Arc::new(InMemoryStore::new());
        let jobs = Arc::new(LocalJobService::new(Arc::clone(&store)));
        Self::new(config, store, jobs)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn AssetStore {
        self.store.as_ref()
    }

    pub fn jobs(&self) -> &dyn JobService {
        self.jobs.as_ref()
    }

    /// Tracker configured from `[jobs]`
    pub fn tracker(&self) -> JobTracker {
        JobTracker::from_config(&self.config.jobs)
    }

    /// Folder level from `[store]`, if any
    pub fn folder(&self) -> Option<&str> {
        self.config.store.folder.as_deref()
    }

    /// Export `asset` honouring the configured overwrite policy
    pub fn export(&self, asset_id: AssetId, asset: Asset) -> Result<ExportOutcome> {
        export(
            self.store(),
            self.jobs(),
            ExportRequest::new(asset_id, asset),
            self.config.store.overwrite,
        )
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
