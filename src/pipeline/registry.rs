//! In-process record of job executions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::execution::JobExecution;

/// Keeps the latest state of every job execution, readable by id.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobExecution>>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot of `job`, replacing the previous one.
    pub fn record(&self, job: &JobExecution) {
        self.jobs.write().insert(job.id, job.clone());
    }

    /// The latest snapshot of job `id`.
    pub fn get(&self, id: Uuid) -> Option<JobExecution> {
        self.jobs.read().get(&id).cloned()
    }

    /// Every job, oldest first.
    pub fn all(&self) -> Vec<JobExecution> {
        let mut jobs: Vec<_> = self.jobs.read().values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }
}
