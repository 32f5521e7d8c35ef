use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::batch::BatchReport;

/// Number of jobs kept before the oldest completed ones are dropped
pub const DEFAULT_JOB_CAPACITY: usize = 1000;

/// Lifecycle of a submitted batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Queued {
        urls: usize,
        queued_at: DateTime<Utc>,
    },
    Running {
        urls: usize,
        started_at: DateTime<Utc>,
    },
    Completed {
        report: BatchReport,
        finished_at: DateTime<Utc>,
    },
}

/// Shared table of batch statuses, keyed by job id.
///
/// Queued and running jobs are always kept; completed jobs are pruned oldest
/// first once the table grows past its capacity.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<Uuid, JobStatus>>>,
    capacity: usize,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOB_CAPACITY)
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<JobStatus> {
        self.jobs.lock().ok()?.get(id).cloned()
    }

    pub(crate) fn set(&self, id: Uuid, status: JobStatus) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(id, status);
            prune_completed(&mut jobs, self.capacity);
        }
    }

    pub(crate) fn remove(&self, id: &Uuid) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.remove(id);
        }
    }
}

fn prune_completed(jobs: &mut HashMap<Uuid, JobStatus>, capacity: usize) {
    if jobs.len() <= capacity {
        return;
    }

    let mut completed: Vec<(DateTime<Utc>, Uuid)> = jobs
        .iter()
        .filter_map(|(id, status)| match status {
            JobStatus::Completed { finished_at, .. } => Some((*finished_at, *id)),
            _ => None,
        })
        .collect();
    completed.sort();

    let excess = jobs.len() - capacity;
    for (_, id) in completed.into_iter().take(excess) {
        jobs.remove(&id);
    }
}
