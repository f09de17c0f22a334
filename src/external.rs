//! Remote system clients the pipeline depends on.
//!
//! Only the trait boundaries live here; transports are supplied by the
//! embedding application.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{DirectoryEntry, EmploymentResponse, IndividualResponse};

/// Payload sent to the benefits provider for one contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionRequest {
    /// Participant id.
    pub employee_id: String,
    /// Idempotency key, the calculation id.
    pub calculation_id: String,
    /// Employee portion.
    pub employee_amount: Decimal,
    /// Employer portion.
    pub employer_amount: Decimal,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
}

/// Benefits provider API.
#[async_trait]
pub trait BenefitsApi: Send + Sync {
    /// Registers a deduction and returns the provider's deduction id.
    async fn register_deduction(
        &self,
        tenant_id: &str,
        request: &DeductionRequest,
    ) -> EngineResult<String>;
}

/// HR directory API.
#[async_trait]
pub trait HrDirectoryApi: Send + Sync {
    /// Lists every individual in the tenant's directory.
    async fn list_directory(&self, tenant_id: &str) -> EngineResult<Vec<DirectoryEntry>>;

    /// Fetches personal details for a batch of ids.
    async fn retrieve_individuals(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> EngineResult<Vec<IndividualResponse>>;

    /// Fetches employment details for a batch of ids.
    async fn retrieve_employments(
        &self,
        tenant_id: &str,
        ids: &[String],
    ) -> EngineResult<Vec<EmploymentResponse>>;
}
