//! Rule definition stores.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::definition::RuleDefinition;

/// Source of persisted rule definitions.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Returns every definition.
    async fn list_all_rule_definitions(&self) -> EngineResult<Vec<RuleDefinition>>;
}

/// A [`RuleStore`] held in memory.
///
/// Clones share state, so an administrator handle can edit definitions that
/// a [`crate::rules::RuleEngine`] reloads from.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    definitions: Arc<RwLock<Vec<RuleDefinition>>>,
}

impl InMemoryRuleStore {
    /// Creates a store holding `definitions`.
    pub fn new(definitions: Vec<RuleDefinition>) -> Self {
        Self {
            definitions: Arc::new(RwLock::new(definitions)),
        }
    }

    /// Adds a definition or replaces the one with the same name.
    pub fn upsert(&self, definition: RuleDefinition) {
        let mut definitions = self.definitions.write();
        match definitions.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => *existing = definition,
            None => definitions.push(definition),
        }
    }

    /// Replaces every definition.
    pub fn replace_all(&self, definitions: Vec<RuleDefinition>) {
        *self.definitions.write() = definitions;
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn list_all_rule_definitions(&self) -> EngineResult<Vec<RuleDefinition>> {
        Ok(self.definitions.read().clone())
    }
}

/// A [`RuleStore`] reading `*.yaml` files from a directory.
///
/// Each file is one definition named after its file stem, stamped with the
/// file's modification time. Files are returned in name order.
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    dir: PathBuf,
}

impl FileRuleStore {
    /// Creates a store over `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The directory read.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl RuleStore for FileRuleStore {
    async fn list_all_rule_definitions(&self) -> EngineResult<Vec<RuleDefinition>> {
        let dir_str = self.dir.display().to_string();
        let not_found = || EngineError::ConfigNotFound {
            path: dir_str.clone(),
        };

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|_| not_found())?;

        let mut definitions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|_| not_found())? {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let path_str = path.display().to_string();
            let rule_text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| EngineError::ConfigParseError {
                    path: path_str.clone(),
                    message: e.to_string(),
                })?;
            let last_updated = entry
                .metadata()
                .await
                .and_then(|meta| meta.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            debug!(rule_base = name, path = %path_str, "Read rule definition");
            definitions.push(RuleDefinition {
                name: name.to_string(),
                rule_text,
                last_updated,
            });
        }

        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }
}
