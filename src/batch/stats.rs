//! Stage counters and execution records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::StageKind;
use crate::error::{EngineError, ErrorClass};

/// One failure observed while running a stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    /// 1-based position of the item in read order; `None` for a failed
    /// chunk write.
    pub item: Option<usize>,
    /// Fault class of the error.
    #[serde(skip)]
    pub class: ErrorClass,
    /// Error message.
    pub message: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Whether the failure was skipped (otherwise it failed the stage).
    pub skipped: bool,
}

/// Counters of one stage run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageStats {
    /// Items read.
    pub read_count: usize,
    /// Records written.
    pub write_count: usize,
    /// Items skipped after terminal failures.
    pub skip_count: usize,
    /// Items the processor filtered out.
    pub filter_count: usize,
    /// Extra attempts made across items and chunk writes.
    pub retry_count: usize,
    /// Items whose key was new to the store.
    pub new_count: usize,
    /// Items whose key already existed.
    pub existing_count: usize,
    /// Chunks committed.
    pub commit_count: usize,
    /// The first failures, capped by `max_reported_failures`.
    pub failures: Vec<FailureRecord>,
}

impl StageStats {
    pub(crate) fn record_failure(&mut self, failure: FailureRecord, max_reported: usize) {
        if self.failures.len() < max_reported {
            self.failures.push(failure);
        }
    }
}

/// Terminal state of a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Still running.
    Running,
    /// Every item was read and handled.
    Completed,
    /// The fault policy was exhausted.
    Failed,
    /// Cancelled between chunks.
    Stopped,
}

/// Record of one stage run.
#[derive(Debug, Clone, Serialize)]
pub struct StageExecution {
    /// The stage.
    pub stage: StageKind,
    /// Outcome.
    pub status: StageStatus,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub ended_at: Option<DateTime<Utc>>,
    /// Counters.
    pub stats: StageStats,
    /// The error that failed the stage.
    #[serde(skip)]
    pub error: Option<EngineError>,
}

impl StageExecution {
    pub(crate) fn start(stage: StageKind) -> Self {
        Self {
            stage,
            status: StageStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            stats: StageStats::default(),
            error: None,
        }
    }

    pub(crate) fn finish(&mut self, result: Result<(), EngineError>) {
        self.ended_at = Some(Utc::now());
        match result {
            Ok(()) => self.status = StageStatus::Completed,
            Err(EngineError::Cancelled) => self.status = StageStatus::Stopped,
            Err(e) => {
                self.status = StageStatus::Failed;
                self.error = Some(e);
            }
        }
    }

    /// Wall-clock duration, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds())
    }
}
