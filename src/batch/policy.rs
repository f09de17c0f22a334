//! Retry and skip decisions of a stage.

use std::time::Duration;

use crate::config::{StageConfig, StageKind};
use crate::error::{EngineError, ErrorClass};

/// Which terminal item failures a stage may skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipRule {
    /// Every item-level failure.
    AnyItemError,
    /// Only failures of the listed classes.
    Classes(Vec<ErrorClass>),
}

impl SkipRule {
    fn matches(&self, class: ErrorClass) -> bool {
        match self {
            SkipRule::AnyItemError => true,
            SkipRule::Classes(classes) => classes.contains(&class),
        }
    }
}

/// Fault tolerance settings of one stage.
///
/// Systemic errors and cancellation are never retried or skipped,
/// whatever the rule says.
///
/// # Example
///
/// ```
/// use contribution_engine::batch::FaultPolicy;
/// use contribution_engine::config::{StageConfig, StageKind};
/// use contribution_engine::error::EngineError;
///
/// let config = StageConfig::default_for(StageKind::Deduction);
/// let policy = FaultPolicy::for_stage(StageKind::Deduction, &config);
/// let error = EngineError::processing("timeout");
///
/// assert!(policy.should_retry(&error, 2));
/// assert!(!policy.should_retry(&error, 3));
/// assert!(policy.can_skip(&error, 0));
/// assert!(!policy.can_skip(&error, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultPolicy {
    /// Total attempts per item or chunk write.
    pub retry_limit: u32,
    /// Items that may be skipped before the stage fails.
    pub skip_limit: usize,
    /// Pause between attempts.
    pub backoff: Duration,
    /// Skippable failures.
    pub skip_rule: SkipRule,
}

impl FaultPolicy {
    /// The policy of `stage` with limits from `config`.
    ///
    /// Payroll stages skip any item-level failure; sync only skips missing
    /// data, mapping failures and storage conflicts.
    pub fn for_stage(stage: StageKind, config: &StageConfig) -> Self {
        let skip_rule = match stage {
            StageKind::Eligibility | StageKind::Calculation | StageKind::Deduction => {
                SkipRule::AnyItemError
            }
            StageKind::Sync => SkipRule::Classes(vec![
                ErrorClass::DataNotFound,
                ErrorClass::Mapping,
                ErrorClass::StorageConflict,
            ]),
        };
        Self {
            retry_limit: config.retry_limit.max(1),
            skip_limit: config.skip_limit as usize,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            skip_rule,
        }
    }

    /// True if another attempt should follow `attempts` failed ones.
    pub fn should_retry(&self, error: &EngineError, attempts: u32) -> bool {
        error.is_retryable() && attempts < self.retry_limit
    }

    /// True if `error` is of a skippable class.
    pub fn is_skippable(&self, error: &EngineError) -> bool {
        error.is_retryable() && self.skip_rule.matches(error.class())
    }

    /// True if one more item failing with `error` fits the budget.
    pub fn can_skip(&self, error: &EngineError, skipped: usize) -> bool {
        self.can_skip_many(error, skipped, 1)
    }

    /// True if `count` more items failing with `error` fit the budget.
    pub fn can_skip_many(&self, error: &EngineError, skipped: usize, count: usize) -> bool {
        self.is_skippable(error) && skipped + count <= self.skip_limit
    }
}
