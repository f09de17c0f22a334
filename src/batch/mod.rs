//! Chunk-oriented batch framework.
//!
//! A stage is a reader, a processor and a writer run under a
//! [`FaultPolicy`]. The reader feeds a bounded channel from its own task;
//! items are grouped into chunks, processed concurrently within a chunk
//! with order preserved, and each chunk is committed by one writer call.

mod policy;
mod reader;
mod stage;
mod stats;
mod traits;
mod writer;

pub use policy::{FaultPolicy, SkipRule};
pub use reader::{DEFAULT_PAGE_SIZE, RepositoryReader};
pub use stage::{Stage, StageSettings};
pub use stats::{FailureRecord, StageExecution, StageStats, StageStatus};
pub use traits::{ItemProcessor, ItemReader, ItemWriter, StageContext, WriteReport};
pub use writer::{KeyedWriter, WriteMode};
