//! Job orchestration.
//!
//! The [`Orchestrator`] validates launch parameters, pins the rule set,
//! runs a job's stages in order and records every state change in the
//! [`JobRegistry`]. [`JobListener`]s observe job and stage transitions.

mod execution;
mod listener;
mod orchestrator;
mod registry;

pub use execution::{JobExecution, JobKind, JobStatus, JobSummary};
pub use listener::{CacheFlushListener, JobListener, LoggingListener};
pub use orchestrator::{JobHandle, Orchestrator};
pub use registry::JobRegistry;
