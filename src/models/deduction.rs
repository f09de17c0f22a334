//! Deduction stage output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::period::PayrollPeriod;
use crate::storage::Record;

/// A contribution registered with the benefits provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionOutcome {
    /// The calculation this deduction was registered for.
    pub calculation_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Participant id.
    pub employee_id: String,
    /// Period the deduction applies to.
    pub period: PayrollPeriod,
    /// Employee portion.
    pub employee_amount: Decimal,
    /// Employer portion (match plus profit sharing).
    pub employer_amount: Decimal,
    /// Remote deduction id.
    pub deduction_id: String,
    /// When the provider accepted the registration.
    pub registered_at: DateTime<Utc>,
}

impl DeductionOutcome {
    /// Total registered amount.
    pub fn total(&self) -> Decimal {
        self.employee_amount + self.employer_amount
    }
}

impl Record for DeductionOutcome {
    fn key(&self) -> String {
        self.calculation_id.clone()
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}
