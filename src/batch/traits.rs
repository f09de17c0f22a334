//! The reader, processor and writer seams of a stage.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::config::StageKind;
use crate::error::EngineResult;
use crate::models::PayrollPeriod;

/// Identity of the stage being run, handed to readers on open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    /// Owning job execution.
    pub job_id: Uuid,
    /// Tenant the job runs for.
    pub tenant_id: String,
    /// Period window; absent for the sync job.
    pub period: Option<PayrollPeriod>,
    /// The stage.
    pub stage: StageKind,
}

/// Produces the items of a stage one at a time.
///
/// A reader runs on its own task and feeds the stage through a bounded
/// channel. `open` rewinds it to the first item.
#[async_trait]
pub trait ItemReader: Send + 'static {
    /// Item type produced.
    type Item: Send + 'static;

    /// Prepares the reader for a run.
    async fn open(&mut self, ctx: &StageContext) -> EngineResult<()>;

    /// Returns the next item, or `None` once exhausted.
    async fn read(&mut self) -> EngineResult<Option<Self::Item>>;
}

/// Transforms one item.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Item type consumed.
    type Input: Send + Sync;
    /// Item type produced.
    type Output: Send + Sync;

    /// Processes one item. `Ok(None)` filters it out of the stage.
    async fn process(&self, item: &Self::Input) -> EngineResult<Option<Self::Output>>;
}

/// Commits a chunk of processed items.
#[async_trait]
pub trait ItemWriter: Send + Sync {
    /// Item type written.
    type Item: Send + Sync;

    /// Writes every item of the chunk as one unit.
    async fn write(&self, items: &[Self::Item]) -> EngineResult<WriteReport>;
}

/// Counts reported by one chunk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Records persisted.
    pub written: usize,
    /// Items whose key was not yet stored.
    pub new: usize,
    /// Items whose key was already stored.
    pub existing: usize,
}
