//! Persistence boundaries used by the pipeline.
//!
//! The engine never talks to a database directly; readers and writers go
//! through [`Repository`] and processors fetch plan data through
//! [`PlanStore`]. [`memory`] provides in-process implementations.

pub mod memory;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::models::TenantPlan;

pub use memory::{InMemoryPlanStore, InMemoryRepository};

/// A keyed, tenant-scoped record.
pub trait Record: Clone + Send + Sync + 'static {
    /// Key unique within a tenant.
    fn key(&self) -> String;

    /// Owning tenant.
    fn tenant_id(&self) -> &str;
}

/// Storage for one record type.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Returns up to `limit` records of `tenant_id` in key order, starting at `offset`.
    async fn page(&self, tenant_id: &str, offset: usize, limit: usize) -> EngineResult<Vec<R>>;

    /// Returns the persisted records among `keys`.
    async fn find_by_keys(&self, tenant_id: &str, keys: &[String]) -> EngineResult<Vec<R>>;

    /// Persists every record, replacing records with the same key.
    ///
    /// Either all records are stored or none are.
    async fn save_all(&self, records: &[R]) -> EngineResult<()>;

    /// Deletes every record of a tenant, returning how many were removed.
    async fn delete_by_tenant(&self, tenant_id: &str) -> EngineResult<usize>;
}

/// Source of tenant plan configuration.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Returns the active plan of `tenant_id`.
    ///
    /// Fails with [`crate::error::EngineError::DataNotFound`] when the tenant
    /// has no plan.
    async fn plan_for_tenant(&self, tenant_id: &str) -> EngineResult<TenantPlan>;
}
