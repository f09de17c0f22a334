//! Concrete stages of the payroll and sync jobs.
//!
//! Each module pairs a processor with the reader and writer it runs with
//! and exposes a `build` function assembling the whole [`Stage`]. Stages
//! are built fresh for every job execution.
//!
//! [`Stage`]: crate::batch::Stage

pub mod calculation;
pub mod deduction;
pub mod eligibility;
pub mod sync;

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::EngineResult;
use crate::external::{BenefitsApi, HrDirectoryApi};
use crate::models::{
    CalculationResult, DeductionOutcome, EligibilityRecord, Participant, TenantPlan,
};
use crate::storage::{PlanStore, Repository};

/// Stores and remote clients the stages run against.
#[derive(Clone)]
pub struct Resources {
    /// Participants, read by eligibility and calculation, written by sync.
    pub participants: Arc<dyn Repository<Participant>>,
    /// Eligibility stage output.
    pub eligibility_records: Arc<dyn Repository<EligibilityRecord>>,
    /// Calculation stage output.
    pub calculation_results: Arc<dyn Repository<CalculationResult>>,
    /// Deduction stage output.
    pub deduction_outcomes: Arc<dyn Repository<DeductionOutcome>>,
    /// Tenant plan configuration.
    pub plans: Arc<dyn PlanStore>,
    /// Benefits provider.
    pub benefits: Arc<dyn BenefitsApi>,
    /// HR directory.
    pub directory: Arc<dyn HrDirectoryApi>,
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources").finish_non_exhaustive()
    }
}

/// The tenant plan, fetched on first use and kept for the rest of the job.
pub(crate) struct TenantPlanCache {
    store: Arc<dyn PlanStore>,
    tenant_id: String,
    plan: OnceCell<TenantPlan>,
}

impl TenantPlanCache {
    pub(crate) fn new(store: Arc<dyn PlanStore>, tenant_id: impl Into<String>) -> Self {
        Self {
            store,
            tenant_id: tenant_id.into(),
            plan: OnceCell::new(),
        }
    }

    pub(crate) async fn get(&self) -> EngineResult<&TenantPlan> {
        self.plan
            .get_or_try_init(|| self.store.plan_for_tenant(&self.tenant_id))
            .await
    }
}
