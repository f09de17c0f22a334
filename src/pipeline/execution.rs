//! Job execution records and summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::batch::{StageContext, StageExecution};
use crate::config::StageKind;
use crate::error::EngineError;
use crate::models::PayrollPeriod;

/// The jobs the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Eligibility, calculation and deduction for one period.
    Payroll,
    /// HR directory synchronization.
    DirectorySync,
}

impl JobKind {
    /// Job name used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Payroll => "payroll",
            JobKind::DirectorySync => "directory-sync",
        }
    }

    /// Stages of the job in execution order.
    pub fn stages(&self) -> &'static [StageKind] {
        match self {
            JobKind::Payroll => &[
                StageKind::Eligibility,
                StageKind::Calculation,
                StageKind::Deduction,
            ],
            JobKind::DirectorySync => &[StageKind::Sync],
        }
    }
}

/// Lifecycle state of a job.
///
/// `Created → Running(stage)… → Completed`; any stage may end the job in
/// `Failed`, and cancellation between chunks ends it in `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Registered, not yet started.
    Created,
    /// Running the given stage.
    Running(StageKind),
    /// Every stage completed.
    Completed,
    /// A stage exhausted its fault policy.
    Failed,
    /// Cancelled.
    Stopped,
}

impl JobStatus {
    /// True once the job can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }
}

/// One run of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobExecution {
    /// Execution id.
    pub id: Uuid,
    /// Which job.
    pub job: JobKind,
    /// Tenant the job runs for.
    pub tenant_id: String,
    /// Period window; `None` for directory sync.
    pub period: Option<PayrollPeriod>,
    /// Current state.
    pub status: JobStatus,
    /// Rule set generation pinned at launch, for payroll jobs.
    pub rule_generation: Option<u64>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Stage runs in execution order.
    pub stages: Vec<StageExecution>,
    /// Why the job failed.
    #[serde(skip)]
    pub failure: Option<EngineError>,
    #[serde(skip)]
    max_reported_failures: usize,
}

impl JobExecution {
    pub(crate) fn new(
        job: JobKind,
        tenant_id: impl Into<String>,
        period: Option<PayrollPeriod>,
        max_reported_failures: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            tenant_id: tenant_id.into(),
            period,
            status: JobStatus::Created,
            rule_generation: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            stages: Vec::new(),
            failure: None,
            max_reported_failures,
        }
    }

    pub(crate) fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn enter_stage(&mut self, stage: StageKind) {
        self.status = JobStatus::Running(stage);
    }

    pub(crate) fn finish(&mut self, status: JobStatus, failure: Option<EngineError>) {
        self.status = status;
        self.failure = failure;
        self.ended_at = Some(Utc::now());
    }

    /// The context handed to `stage`.
    pub fn stage_context(&self, stage: StageKind) -> StageContext {
        StageContext {
            job_id: self.id,
            tenant_id: self.tenant_id.clone(),
            period: self.period,
            stage,
        }
    }

    /// The run of `stage`, if it started.
    pub fn stage(&self, stage: StageKind) -> Option<&StageExecution> {
        self.stages.iter().find(|execution| execution.stage == stage)
    }

    /// Wall-clock duration, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(started), Some(ended)) => Some((ended - started).num_milliseconds()),
            _ => None,
        }
    }

    /// Aggregated counts and the first failure causes.
    pub fn summary(&self) -> JobSummary {
        let mut summary = JobSummary {
            job_id: self.id,
            job: self.job,
            tenant_id: self.tenant_id.clone(),
            status: self.status,
            read: 0,
            written: 0,
            skipped: 0,
            filtered: 0,
            new: 0,
            existing: 0,
            failures: Vec::new(),
            duration_ms: self.duration_ms(),
            message: String::new(),
        };

        for execution in &self.stages {
            let stats = &execution.stats;
            summary.read += stats.read_count;
            summary.written += stats.write_count;
            summary.skipped += stats.skip_count;
            summary.filtered += stats.filter_count;
            summary.new += stats.new_count;
            summary.existing += stats.existing_count;
            summary.failures.extend(stats.failures.iter().map(|failure| match failure.item {
                Some(item) => format!("{} item {}: {}", execution.stage, item, failure.message),
                None => format!("{} chunk write: {}", execution.stage, failure.message),
            }));
        }
        if let Some(failure) = &self.failure {
            summary.failures.push(failure.to_string());
        }
        summary.failures.truncate(self.max_reported_failures.max(1));
        summary.message = summary.describe(self.failure.as_ref());
        summary
    }
}

/// The user-visible outcome of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    /// Execution id.
    pub job_id: Uuid,
    /// Which job.
    pub job: JobKind,
    /// Tenant.
    pub tenant_id: String,
    /// Final (or current) state.
    pub status: JobStatus,
    /// Items read across stages.
    pub read: usize,
    /// Records written across stages.
    pub written: usize,
    /// Items skipped across stages.
    pub skipped: usize,
    /// Items filtered across stages.
    pub filtered: usize,
    /// New records.
    pub new: usize,
    /// Records that already existed.
    pub existing: usize,
    /// First failure causes.
    pub failures: Vec<String>,
    /// Duration in milliseconds, once finished.
    pub duration_ms: Option<i64>,
    /// One-line description.
    pub message: String,
}

impl JobSummary {
    fn describe(&self, failure: Option<&EngineError>) -> String {
        match (self.job, self.status, failure) {
            (JobKind::DirectorySync, JobStatus::Completed, _) => format!(
                "Successfully synced employees. Processed: {}, New: {}, Existing: {}, Failed: {}",
                self.read, self.new, self.existing, self.skipped
            ),
            (JobKind::Payroll, JobStatus::Completed, _) => format!(
                "Payroll completed. Read: {}, Written: {}, Skipped: {}, Filtered: {}",
                self.read, self.written, self.skipped, self.filtered
            ),
            (_, JobStatus::Stopped, _) => format!("{} job stopped", self.job.name()),
            (_, _, Some(failure)) => format!("{} job failed: {failure}", self.job.name()),
            (_, status, None) => format!("{} job is {status:?}", self.job.name()),
        }
    }
}
