//! Core data models for the contribution engine.
//!
//! This module contains the records that flow between pipeline stages,
//! the tenant plan reference data, and the HR directory payloads.

mod calculation;
mod deduction;
mod directory;
mod eligibility;
mod participant;
pub(crate) mod period;
mod plan;

pub use calculation::{
    CalculationResult, CalculationStatus, ContributionAmounts, calculation_id, percent_of,
};
pub use deduction::DeductionOutcome;
pub use directory::{
    DirectoryEntry, Employment, EmploymentResponse, Income, Individual, IndividualResponse,
};
pub use eligibility::{EligibilityRecord, EligibilityStatus};
pub use participant::Participant;
pub use period::PayrollPeriod;
pub use plan::{
    EmployeeContributionConfig, EmployerMatchRule, MatchType, PlanEligibility, TenantPlan,
};
