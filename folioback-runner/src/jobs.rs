//! Background job store — asynchronous execution without engine coupling.
//!
//! The store spawns one worker thread per submitted config and records the
//! lifecycle `Queued → Running → Done | Failed`. Terminal states are
//! written exactly once; the engine itself knows nothing about jobs and
//! carries no process-wide state.

use folioback_core::data::MarketSnapshot;
use log::warn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::BacktestConfig;
use crate::result::BacktestReport;
use crate::runner::run_backtest;

pub type JobId = String;

/// Lifecycle of a submitted backtest.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Running,
    Done(Box<BacktestReport>),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done(_) | JobStatus::Failed(_))
    }
}

/// Thread-backed job registry, pollable by ID.
#[derive(Default)]
pub struct JobStore {
    statuses: Arc<Mutex<HashMap<JobId, JobStatus>>>,
    handles: Mutex<HashMap<JobId, JoinHandle<()>>>,
    next_seq: AtomicU64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a config for background execution, returning its job ID.
    ///
    /// The ID is unique per submission even when the same config is
    /// submitted twice.
    pub fn submit(&self, config: BacktestConfig, market: Arc<MarketSnapshot>) -> JobId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = format!("{seq}-{}", &config.run_id()[..12]);
        set_status(&self.statuses, &id, JobStatus::Queued);

        let statuses = Arc::clone(&self.statuses);
        let job_id = id.clone();
        let handle = std::thread::spawn(move || {
            set_status(&statuses, &job_id, JobStatus::Running);
            let terminal = match run_backtest(&config, &market) {
                Ok(report) => JobStatus::Done(Box::new(report)),
                Err(err) => JobStatus::Failed(err.to_string()),
            };
            set_status(&statuses, &job_id, terminal);
        });
        if let Ok(mut handles) = self.handles.lock() {
            handles.insert(id.clone(), handle);
        }
        id
    }

    /// Current status, `None` for an unknown ID.
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.statuses.lock().ok()?.get(id).cloned()
    }

    /// Block until the job's worker thread finishes. No-op for unknown IDs.
    pub fn wait(&self, id: &str) {
        let handle = match self.handles.lock() {
            Ok(mut handles) => handles.remove(id),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("job {id}: worker thread panicked");
            }
        }
    }
}

/// Record a status transition. Terminal states are never overwritten.
fn set_status(statuses: &Mutex<HashMap<JobId, JobStatus>>, id: &str, status: JobStatus) {
    let Ok(mut map) = statuses.lock() else {
        return;
    };
    match map.get(id) {
        Some(existing) if existing.is_terminal() => {
            warn!("job {id}: ignoring transition after terminal state");
        }
        _ => {
            map.insert(id.to_string(), status);
        }
    }
}
