//! # irrigis Pipeline
//!
//! Orchestration of the irrigated-land mapping steps around an explicit
//! [`Session`]: the TOML configuration, the asset store and the export job
//! service.
//!
//! Products are named by [`AssetId`], which is deterministic in the run
//! parameters. Before exporting, the store is asked whether the asset
//! exists; with `overwrite` off an existing product is left alone and the
//! step reports it as skipped.

pub mod assets;
pub mod config;
pub mod error;
pub mod jobs;
pub mod session;
pub mod tracker;
pub mod workflow;

pub use assets::{Asset, AssetId, AssetStore, DirectoryStore, InMemoryStore};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use jobs::{export, ExportOutcome, ExportRequest, JobHandle, JobService, JobStatus, LocalJobService};
pub use session::Session;
pub use tracker::{JobTracker, TrackReport};
pub use workflow::{
    build_feature_composite, classify, export_feature_composite, export_fused,
    export_training_areas, fuse_seasons, synthesize_training_labels, validate, validate_seasonal,
    ClassificationRun, ClassifyOutcome, CompositeInputs,
};
