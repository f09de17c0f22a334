//! In-memory repositories.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use crate::models::TenantPlan;

use super::{PlanStore, Record, Repository};

/// A [`Repository`] backed by a shared ordered map.
///
/// Clones share the same storage, so a test can keep a handle while the
/// pipeline writes through another.
///
/// # Example
///
/// ```
/// use contribution_engine::storage::InMemoryRepository;
/// use contribution_engine::models::Participant;
///
/// let repo: InMemoryRepository<Participant> = InMemoryRepository::new();
/// let handle = repo.clone();
/// assert!(handle.is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryRepository<R: Record> {
    records: Arc<Mutex<BTreeMap<(String, String), R>>>,
}

impl<R: Record> Clone for InMemoryRepository<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R: Record> Default for InMemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> InMemoryRepository<R> {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Creates a repository seeded with `records`.
    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let repo = Self::new();
        repo.insert_all(records);
        repo
    }

    /// Inserts records directly, bypassing the async API.
    pub fn insert_all(&self, records: impl IntoIterator<Item = R>) {
        let mut map = self.records.lock();
        for record in records {
            map.insert((record.tenant_id().to_string(), record.key()), record);
        }
    }

    /// Every record of `tenant_id` in key order.
    pub fn all(&self, tenant_id: &str) -> Vec<R> {
        self.records
            .lock()
            .iter()
            .filter(|((tenant, _), _)| tenant == tenant_id)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Looks up one record.
    pub fn get(&self, tenant_id: &str, key: &str) -> Option<R> {
        self.records
            .lock()
            .get(&(tenant_id.to_string(), key.to_string()))
            .cloned()
    }

    /// Total number of records across tenants.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl<R: Record> Repository<R> for InMemoryRepository<R> {
    async fn page(&self, tenant_id: &str, offset: usize, limit: usize) -> EngineResult<Vec<R>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|((tenant, _), _)| tenant == tenant_id)
            .skip(offset)
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn find_by_keys(&self, tenant_id: &str, keys: &[String]) -> EngineResult<Vec<R>> {
        let map = self.records.lock();
        Ok(keys
            .iter()
            .filter_map(|key| map.get(&(tenant_id.to_string(), key.clone())).cloned())
            .collect())
    }

    async fn save_all(&self, records: &[R]) -> EngineResult<()> {
        self.insert_all(records.iter().cloned());
        Ok(())
    }

    async fn delete_by_tenant(&self, tenant_id: &str) -> EngineResult<usize> {
        let mut map = self.records.lock();
        let before = map.len();
        map.retain(|(tenant, _), _| tenant != tenant_id);
        Ok(before - map.len())
    }
}

/// A [`PlanStore`] holding plans in a map keyed by tenant.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanStore {
    plans: Arc<Mutex<HashMap<String, TenantPlan>>>,
}

impl InMemoryPlanStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the plan of its tenant.
    pub fn insert(&self, plan: TenantPlan) {
        self.plans.lock().insert(plan.tenant_id.clone(), plan);
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn plan_for_tenant(&self, tenant_id: &str) -> EngineResult<TenantPlan> {
        self.plans
            .lock()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| EngineError::DataNotFound {
                message: format!("no plan configured for tenant {tenant_id}"),
            })
    }
}
