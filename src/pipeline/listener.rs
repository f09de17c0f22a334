//! Job and stage lifecycle listeners.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::batch::StageExecution;
use crate::config::StageKind;
use crate::error::EngineResult;
use crate::stages::sync::DirectoryCache;

use super::execution::{JobExecution, JobStatus};

/// Observes job and stage transitions.
///
/// Errors returned by a listener are logged and never change the outcome
/// of the job.
pub trait JobListener: Send + Sync {
    /// Called once the job has started, before its first stage.
    fn before_job(&self, _job: &JobExecution) -> EngineResult<()> {
        Ok(())
    }

    /// Called once the job has reached a terminal state.
    fn after_job(&self, _job: &JobExecution) -> EngineResult<()> {
        Ok(())
    }

    /// Called before `stage` starts.
    fn before_stage(&self, _job: &JobExecution, _stage: StageKind) -> EngineResult<()> {
        Ok(())
    }

    /// Called once `stage` has finished.
    fn after_stage(&self, _job: &JobExecution, _stage: &StageExecution) -> EngineResult<()> {
        Ok(())
    }
}

/// Logs job parameters, durations, per-stage counts and failure causes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl JobListener for LoggingListener {
    fn before_job(&self, job: &JobExecution) -> EngineResult<()> {
        info!(
            job_id = %job.id,
            job = job.job.name(),
            tenant_id = %job.tenant_id,
            period = ?job.period.map(|p| p.key()),
            rule_generation = ?job.rule_generation,
            "Job started"
        );
        Ok(())
    }

    fn after_job(&self, job: &JobExecution) -> EngineResult<()> {
        let summary = job.summary();
        match job.status {
            JobStatus::Failed => error!(
                job_id = %job.id,
                job = job.job.name(),
                duration_ms = ?summary.duration_ms,
                causes = ?summary.failures,
                "{}",
                summary.message
            ),
            JobStatus::Stopped => warn!(
                job_id = %job.id,
                job = job.job.name(),
                duration_ms = ?summary.duration_ms,
                "{}",
                summary.message
            ),
            _ => info!(
                job_id = %job.id,
                job = job.job.name(),
                duration_ms = ?summary.duration_ms,
                read = summary.read,
                written = summary.written,
                skipped = summary.skipped,
                filtered = summary.filtered,
                "{}",
                summary.message
            ),
        }
        Ok(())
    }

    fn before_stage(&self, job: &JobExecution, stage: StageKind) -> EngineResult<()> {
        debug!(job_id = %job.id, stage = %stage, "Entering stage");
        Ok(())
    }

    fn after_stage(&self, job: &JobExecution, stage: &StageExecution) -> EngineResult<()> {
        let stats = &stage.stats;
        info!(
            job_id = %job.id,
            stage = %stage.stage,
            status = ?stage.status,
            duration_ms = ?stage.duration_ms(),
            read = stats.read_count,
            written = stats.write_count,
            skipped = stats.skip_count,
            filtered = stats.filter_count,
            new = stats.new_count,
            existing = stats.existing_count,
            "Stage summary"
        );
        for failure in &stats.failures {
            warn!(
                job_id = %job.id,
                stage = %stage.stage,
                item = ?failure.item,
                skipped = failure.skipped,
                "Stage failure: {}",
                failure.message
            );
        }
        Ok(())
    }
}

/// Flushes a job's [`DirectoryCache`] once its sync stage ends.
pub struct CacheFlushListener {
    cache: Arc<DirectoryCache>,
}

impl CacheFlushListener {
    /// Creates a listener flushing `cache`.
    pub fn new(cache: Arc<DirectoryCache>) -> Self {
        Self { cache }
    }
}

impl JobListener for CacheFlushListener {
    fn after_stage(&self, _job: &JobExecution, stage: &StageExecution) -> EngineResult<()> {
        if stage.stage == StageKind::Sync {
            self.cache.flush();
        }
        Ok(())
    }
}

/// Listeners of one job run, invoked in registration order.
#[derive(Clone, Default)]
pub(crate) struct Listeners(Vec<Arc<dyn JobListener>>);

impl Listeners {
    pub(crate) fn push(&mut self, listener: Arc<dyn JobListener>) {
        self.0.push(listener);
    }

    fn notify<F>(&self, job: &JobExecution, hook: &str, call: F)
    where
        F: Fn(&dyn JobListener) -> EngineResult<()>,
    {
        for listener in &self.0 {
            if let Err(e) = call(listener.as_ref()) {
                warn!(job_id = %job.id, hook, error = %e, "Listener failed; ignoring");
            }
        }
    }

    pub(crate) fn before_job(&self, job: &JobExecution) {
        self.notify(job, "before_job", |l| l.before_job(job));
    }

    pub(crate) fn after_job(&self, job: &JobExecution) {
        self.notify(job, "after_job", |l| l.after_job(job));
    }

    pub(crate) fn before_stage(&self, job: &JobExecution, stage: StageKind) {
        self.notify(job, "before_stage", |l| l.before_stage(job, stage));
    }

    pub(crate) fn after_stage(&self, job: &JobExecution, stage: &StageExecution) {
        self.notify(job, "after_stage", |l| l.after_stage(job, stage));
    }
}
