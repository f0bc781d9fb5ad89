//! Tracker behaviour against a job service with scripted answers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use irrigis_core::Raster;
use irrigis_pipeline::{
    Asset, AssetId, ExportRequest, InMemoryStore, JobHandle, JobService, JobStatus, JobTracker,
    LocalJobService, PipelineError, Result,
};

/// One answer of the scripted service
#[derive(Debug, Clone)]
enum Reply {
    Status(JobStatus),
    ConnectionReset,
}

/// Answers `status` calls from a per-job script; an exhausted script
/// reports the job as completed
#[derive(Default)]
struct ScriptedService {
    scripts: Mutex<HashMap<u64, VecDeque<Reply>>>,
    calls: AtomicUsize,
}

impl ScriptedService {
    fn with_job(self, id: u64, replies: Vec<Reply>) -> Self {
        self.scripts.lock().unwrap().insert(id, replies.into());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JobService for ScriptedService {
    fn submit(&self, _request: ExportRequest) -> Result<JobHandle> {
        Err(PipelineError::Transport("submission disabled".into()))
    }

    fn status(&self, handle: &JobHandle) -> Result<JobStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&handle.id)
            .and_then(|s| s.pop_front());
        match reply {
            Some(Reply::Status(status)) => Ok(status),
            Some(Reply::ConnectionReset) => {
                Err(PipelineError::Transport("connection reset by peer".into()))
            }
            None => Ok(JobStatus::Completed),
        }
    }
}

fn handle(id: u64) -> JobHandle {
    JobHandle {
        id,
        asset_id: AssetId::new(format!("results/job_{id}")).unwrap(),
    }
}

fn tracker() -> JobTracker {
    JobTracker::new(Duration::ZERO, Duration::ZERO)
}

#[test]
fn test_round_robin_until_all_complete() {
    let service = ScriptedService::default()
        .with_job(
            1,
            vec![
                Reply::Status(JobStatus::Pending),
                Reply::Status(JobStatus::Running),
                Reply::Status(JobStatus::Completed),
            ],
        )
        .with_job(2, vec![Reply::Status(JobStatus::Completed)]);

    let report = tracker()
        .track(&service, vec![("slow".into(), handle(1)), ("fast".into(), handle(2))])
        .unwrap();
    assert_eq!(report.completed, vec!["fast".to_string(), "slow".to_string()]);
    assert!(report.skipped.is_empty());
    assert_eq!(service.calls(), 4);
}

#[test]
fn test_single_transport_error_is_retried() {
    let service = ScriptedService::default().with_job(
        1,
        vec![Reply::ConnectionReset, Reply::Status(JobStatus::Completed)],
    );
    let report = tracker().track(&service, vec![("ia".into(), handle(1))]).unwrap();
    assert_eq!(report.completed, vec!["ia".to_string()]);
    assert_eq!(service.calls(), 2);
}

#[test]
fn test_second_transport_error_is_fatal() {
    let service = ScriptedService::default()
        .with_job(1, vec![Reply::ConnectionReset, Reply::ConnectionReset]);
    let err = tracker().track(&service, vec![("ia".into(), handle(1))]).unwrap_err();
    match err {
        PipelineError::Transport(message) => assert!(message.contains("ia")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_existing_asset_failure_counts_as_skipped() {
    let service = ScriptedService::default()
        .with_job(
            1,
            vec![Reply::Status(JobStatus::Failed(
                "Cannot overwrite asset 'results/job_1'".into(),
            ))],
        )
        .with_job(2, vec![Reply::Status(JobStatus::Running)]);
    let report = tracker()
        .track(&service, vec![("old".into(), handle(1)), ("new".into(), handle(2))])
        .unwrap();
    assert_eq!(report.skipped, vec!["old".to_string()]);
    assert_eq!(report.completed, vec!["new".to_string()]);
}

#[test]
fn test_remote_failure_is_reported() {
    let service = ScriptedService::default()
        .with_job(1, vec![Reply::Status(JobStatus::Failed("User memory limit exceeded".into()))]);
    let err = tracker().track(&service, vec![("ia".into(), handle(1))]).unwrap_err();
    match err {
        PipelineError::JobFailed { job, message } => {
            assert_eq!(job, "ia");
            assert_eq!(message, "User memory limit exceeded");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_cancelled_job_stops_tracking() {
    let service = ScriptedService::default()
        .with_job(1, vec![Reply::Status(JobStatus::Cancelled)])
        .with_job(2, vec![Reply::Status(JobStatus::Running); 10]);
    let err = tracker()
        .track(&service, vec![("ia".into(), handle(1)), ("other".into(), handle(2))])
        .unwrap_err();
    assert!(matches!(err, PipelineError::JobCancelled(ref job) if job == "ia"));
}

#[test]
fn test_empty_job_list() {
    let service = ScriptedService::default();
    let report = tracker().track(&service, Vec::new()).unwrap();
    assert!(report.completed.is_empty());
    assert_eq!(service.calls(), 0);
}

#[test]
fn test_store_conflict_is_tracked_as_skipped() {
    let store = Arc::new(InMemoryStore::new());
    let service = LocalJobService::new(store.clone());
    let request = || {
        ExportRequest::new(
            AssetId::new("results/ia_2019").unwrap(),
            Asset::ClassMap(Raster::filled(2, 2, 1u8)),
        )
    };
    let first = service.submit(request()).unwrap();
    let second = service.submit(request()).unwrap();
    match service.status(&second).unwrap() {
        JobStatus::Failed(message) => assert!(message.contains("results/ia_2019")),
        other => panic!("unexpected {other:?}"),
    }

    let report = tracker()
        .track(&service, vec![("first".into(), first), ("again".into(), second)])
        .unwrap();
    assert_eq!(report.completed, vec!["first".to_string()]);
    assert_eq!(report.skipped, vec!["again".to_string()]);
    assert_eq!(store.len(), 1);
}
