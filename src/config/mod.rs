//! Configuration loading and management for the contribution engine.
//!
//! This module loads the pipeline configuration (chunk sizes, fault limits
//! and concurrency) from YAML and points at the rule definitions beside it.
//!
//! # Example
//!
//! ```no_run
//! use contribution_engine::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config").unwrap();
//! println!("workers per chunk: {}", loader.config().worker_concurrency);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{PipelineConfig, PipelineFile, StageConfig, StageKind, StageOverrides};
