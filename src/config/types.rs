//! Configuration types for the batch pipeline.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from `pipeline.yaml`, and the resolved
//! [`PipelineConfig`] the orchestrator runs with.

use serde::{Deserialize, Serialize};

/// Identifies a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Participant eligibility evaluation.
    Eligibility,
    /// Contribution calculation.
    Calculation,
    /// Deduction registration.
    Deduction,
    /// HR directory synchronization.
    Sync,
}

impl StageKind {
    /// Lower-case stage name used in logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Eligibility => "eligibility",
            StageKind::Calculation => "calculation",
            StageKind::Deduction => "deduction",
            StageKind::Sync => "sync",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Chunking and fault limits of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Items per commit.
    pub chunk_size: usize,
    /// Total attempts per item or chunk write, including the first.
    pub retry_limit: u32,
    /// Terminally failing items tolerated before the stage fails.
    pub skip_limit: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl StageConfig {
    /// Default limits of a stage.
    ///
    /// | Stage | chunk | retry | skip |
    /// |---|---|---|---|
    /// | eligibility | 10 | 3 | 3 |
    /// | calculation | 5 | 2 | 2 |
    /// | deduction | 5 | 3 | 1 |
    /// | sync | 50 | 3 | 1000 |
    pub fn default_for(stage: StageKind) -> Self {
        let (chunk_size, retry_limit, skip_limit) = match stage {
            StageKind::Eligibility => (10, 3, 3),
            StageKind::Calculation => (5, 2, 2),
            StageKind::Deduction => (5, 3, 1),
            StageKind::Sync => (50, 3, 1000),
        };
        Self {
            chunk_size,
            retry_limit,
            skip_limit,
            retry_backoff_ms: 0,
        }
    }

    fn apply(mut self, overrides: &StageOverrides) -> Self {
        if let Some(chunk_size) = overrides.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(retry_limit) = overrides.retry_limit {
            self.retry_limit = retry_limit;
        }
        if let Some(skip_limit) = overrides.skip_limit {
            self.skip_limit = skip_limit;
        }
        if let Some(backoff) = overrides.retry_backoff_ms {
            self.retry_backoff_ms = backoff;
        }
        self
    }
}

/// Resolved pipeline configuration.
///
/// # Example
///
/// ```
/// use contribution_engine::config::{PipelineConfig, StageKind};
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.stage(StageKind::Eligibility).chunk_size, 10);
/// assert_eq!(config.stage(StageKind::Sync).skip_limit, 1000);
/// assert_eq!(config.prefetch_batch_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Eligibility stage limits.
    pub eligibility: StageConfig,
    /// Calculation stage limits.
    pub calculation: StageConfig,
    /// Deduction stage limits.
    pub deduction: StageConfig,
    /// Sync stage limits.
    pub sync: StageConfig,
    /// Ids per batched directory lookup.
    pub prefetch_batch_size: usize,
    /// Items processed concurrently within a chunk.
    pub worker_concurrency: usize,
    /// Capacity of the reader-to-stage channel.
    pub channel_capacity: usize,
    /// Failure causes kept per stage for summaries.
    pub max_reported_failures: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            eligibility: StageConfig::default_for(StageKind::Eligibility),
            calculation: StageConfig::default_for(StageKind::Calculation),
            deduction: StageConfig::default_for(StageKind::Deduction),
            sync: StageConfig::default_for(StageKind::Sync),
            prefetch_batch_size: 100,
            worker_concurrency: 4,
            channel_capacity: 64,
            max_reported_failures: 10,
        }
    }
}

impl PipelineConfig {
    /// Limits of `stage`.
    pub fn stage(&self, stage: StageKind) -> &StageConfig {
        match stage {
            StageKind::Eligibility => &self.eligibility,
            StageKind::Calculation => &self.calculation,
            StageKind::Deduction => &self.deduction,
            StageKind::Sync => &self.sync,
        }
    }

    /// Mutable limits of `stage`.
    pub fn stage_mut(&mut self, stage: StageKind) -> &mut StageConfig {
        match stage {
            StageKind::Eligibility => &mut self.eligibility,
            StageKind::Calculation => &mut self.calculation,
            StageKind::Deduction => &mut self.deduction,
            StageKind::Sync => &mut self.sync,
        }
    }

    /// Checks every value is usable, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for stage in [
            StageKind::Eligibility,
            StageKind::Calculation,
            StageKind::Deduction,
            StageKind::Sync,
        ] {
            let limits = self.stage(stage);
            if limits.chunk_size == 0 {
                return Err(format!("{stage}.chunk_size must be at least 1"));
            }
            if limits.retry_limit == 0 {
                return Err(format!("{stage}.retry_limit must be at least 1"));
            }
        }
        if self.prefetch_batch_size == 0 {
            return Err("prefetch_batch_size must be at least 1".to_string());
        }
        if self.worker_concurrency == 0 {
            return Err("worker_concurrency must be at least 1".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Per-stage overrides as written in `pipeline.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageOverrides {
    /// Items per commit.
    pub chunk_size: Option<usize>,
    /// Total attempts.
    pub retry_limit: Option<u32>,
    /// Skip budget.
    pub skip_limit: Option<u32>,
    /// Backoff between attempts.
    pub retry_backoff_ms: Option<u64>,
}

/// `pipeline.yaml` file structure; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineFile {
    /// Eligibility overrides.
    #[serde(default)]
    pub eligibility: StageOverrides,
    /// Calculation overrides.
    #[serde(default)]
    pub calculation: StageOverrides,
    /// Deduction overrides.
    #[serde(default)]
    pub deduction: StageOverrides,
    /// Sync overrides.
    #[serde(default)]
    pub sync: StageOverrides,
    /// Ids per batched directory lookup.
    pub prefetch_batch_size: Option<usize>,
    /// Items processed concurrently within a chunk.
    pub worker_concurrency: Option<usize>,
    /// Reader channel capacity.
    pub channel_capacity: Option<usize>,
    /// Failure causes kept per stage.
    pub max_reported_failures: Option<usize>,
}

impl PipelineFile {
    /// Applies the file's overrides on top of the defaults.
    pub fn resolve(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            eligibility: defaults.eligibility.apply(&self.eligibility),
            calculation: defaults.calculation.apply(&self.calculation),
            deduction: defaults.deduction.apply(&self.deduction),
            sync: defaults.sync.apply(&self.sync),
            prefetch_batch_size: self
                .prefetch_batch_size
                .unwrap_or(defaults.prefetch_batch_size),
            worker_concurrency: self
                .worker_concurrency
                .unwrap_or(defaults.worker_concurrency),
            channel_capacity: self.channel_capacity.unwrap_or(defaults.channel_capacity),
            max_reported_failures: self
                .max_reported_failures
                .unwrap_or(defaults.max_reported_failures),
        }
    }
}
