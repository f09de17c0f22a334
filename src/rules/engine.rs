//! The hot-reloadable rule engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};

use super::base::{Evaluation, RuleSet};
use super::compile::compile;
use super::fact::Fact;
use super::store::RuleStore;

/// Result of a successful reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Rule base names now active.
    pub rule_bases: Vec<String>,
    /// Total compiled rules.
    pub rule_count: usize,
    /// Monotonic reload counter, starting at 1.
    pub generation: u64,
    /// When the reload completed.
    pub reloaded_at: DateTime<Utc>,
}

/// Compiles rule definitions from a [`RuleStore`] and serves the active set.
///
/// The active set sits behind an `Arc`; the lock is only held to clone or
/// swap that pointer, so readers keep whatever set they snapshotted while a
/// reload installs the next one.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use contribution_engine::rules::{InMemoryRuleStore, RuleDefinition, RuleEngine};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = InMemoryRuleStore::new(vec![RuleDefinition::new(
///     "eligibility",
///     "rules:\n  - name: always\n    then:\n      - set: eligible\n        value: true\n",
/// )]);
/// let engine = RuleEngine::new(Arc::new(store));
///
/// let summary = engine.reload().await.unwrap();
/// assert_eq!(summary.rule_bases, vec!["eligibility".to_string()]);
/// assert!(engine.snapshot().unwrap().base("eligibility").is_ok());
/// # });
/// ```
pub struct RuleEngine {
    store: Arc<dyn RuleStore>,
    active: RwLock<Option<Arc<RuleSet>>>,
    reloading: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("loaded", &self.active.read().is_some())
            .field("generation", &self.generation())
            .finish()
    }
}

impl RuleEngine {
    /// Creates an engine with no active rule set; call [`Self::reload`].
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
            reloading: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates an engine and performs the initial load.
    pub async fn load(store: Arc<dyn RuleStore>) -> EngineResult<Self> {
        let engine = Self::new(store);
        engine.reload().await?;
        Ok(engine)
    }

    /// Re-reads every definition, recompiles, and swaps the active set.
    ///
    /// On any failure the previously active set stays in place. Concurrent
    /// reloads run one at a time.
    pub async fn reload(&self) -> EngineResult<ReloadSummary> {
        let _guard = self.reloading.lock().await;
        let result = match self.store.list_all_rule_definitions().await {
            Ok(definitions) => compile(&definitions),
            Err(e) => Err(e),
        };

        let generation = self.generation() + 1;
        let set = match result {
            Ok(set) => Arc::new(set.with_generation(generation)),
            Err(e) => {
                warn!(error = %e, "Rule reload failed; keeping previous rule set");
                return Err(e);
            }
        };

        let summary = ReloadSummary {
            rule_bases: set.names(),
            rule_count: set.rule_count(),
            generation,
            reloaded_at: Utc::now(),
        };
        *self.active.write() = Some(set);

        info!(
            generation = summary.generation,
            rule_bases = ?summary.rule_bases,
            rule_count = summary.rule_count,
            "Rule set reloaded"
        );
        Ok(summary)
    }

    /// The active rule set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRulesConfigured`] if nothing has loaded yet.
    pub fn snapshot(&self) -> EngineResult<Arc<RuleSet>> {
        self.active
            .read()
            .clone()
            .ok_or(EngineError::NoRulesConfigured)
    }

    /// Number of successful reloads so far, as carried by the active set.
    pub fn generation(&self) -> u64 {
        self.active
            .read()
            .as_ref()
            .map_or(0, |set| set.generation())
    }

    /// Evaluates the named rule base of the active set against `fact`.
    pub fn evaluate<F: Fact>(&self, base: &str, fact: &mut F) -> EngineResult<Evaluation> {
        self.snapshot()?.base(base)?.evaluate(fact)
    }
}
