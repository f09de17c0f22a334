//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the pipeline
//! configuration and locating the rule definitions that sit beside it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::rules::FileRuleStore;

use super::types::{PipelineConfig, PipelineFile};

/// Loads and provides access to pipeline configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── pipeline.yaml        # Chunk sizes, retry/skip limits, concurrency
/// └── rules/
///     ├── eligibility.yaml # Rule definition "eligibility"
///     └── calculation.yaml # Rule definition "calculation"
/// ```
///
/// # Example
///
/// ```no_run
/// use contribution_engine::config::{ConfigLoader, StageKind};
///
/// let loader = ConfigLoader::load("./config")?;
/// let eligibility = loader.config().stage(StageKind::Eligibility);
/// println!("eligibility chunk size: {}", eligibility.chunk_size);
/// # Ok::<(), contribution_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    config: PipelineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `pipeline.yaml` is missing (`ConfigNotFound`)
    /// - the file is not valid YAML or holds unknown keys (`ConfigParseError`)
    /// - a value is out of range, such as a zero chunk size (`ConfigParseError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let root = path.as_ref().to_path_buf();
        let pipeline_path = root.join("pipeline.yaml");

        let file = Self::load_yaml::<PipelineFile>(&pipeline_path)?;
        let config = file.resolve();
        config
            .validate()
            .map_err(|message| EngineError::ConfigParseError {
                path: pipeline_path.display().to_string(),
                message,
            })?;

        info!(
            path = %pipeline_path.display(),
            worker_concurrency = config.worker_concurrency,
            prefetch_batch_size = config.prefetch_batch_size,
            "Loaded pipeline configuration"
        );

        Ok(Self { root, config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        // An empty file means "all defaults".
        if content.trim().is_empty() {
            return serde_yaml::from_str("{}").map_err(|e| EngineError::ConfigParseError {
                path: path_str,
                message: e.to_string(),
            });
        }

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the resolved pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> PipelineConfig {
        self.config
    }

    /// Directory holding the rule definition files.
    pub fn rules_dir(&self) -> PathBuf {
        self.root.join("rules")
    }

    /// A rule store reading from [`Self::rules_dir`].
    pub fn rule_store(&self) -> FileRuleStore {
        FileRuleStore::new(self.rules_dir())
    }
}
