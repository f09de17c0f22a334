//! Eligibility stage output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::period::{PayrollPeriod, add_months};
use crate::storage::Record;

/// Outcome of an eligibility evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    /// The participant meets every plan requirement.
    Eligible,
    /// At least one requirement is unmet.
    NotEligible,
}

/// The persisted eligibility decision for one participant and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    /// Owning tenant.
    pub tenant_id: String,
    /// Participant id.
    pub employee_id: String,
    /// Period the decision was made for.
    pub period: PayrollPeriod,
    /// Whether the participant is eligible.
    pub eligible: bool,
    /// Status mirror of `eligible`.
    pub status: EligibilityStatus,
    /// Date eligibility took effect, when eligible.
    pub eligibility_date: Option<NaiveDate>,
    /// Rule-supplied explanation.
    pub reason: String,
    /// Age used in the evaluation.
    pub age: u32,
    /// Months of service used in the evaluation.
    pub months_of_service: u32,
    /// Date of this check.
    pub last_check_date: NaiveDate,
    /// When eligibility should be re-evaluated.
    pub next_check_date: NaiveDate,
}

impl EligibilityRecord {
    /// Builds a record, deriving status and the next check date.
    ///
    /// Eligible participants are re-checked after 6 months. Otherwise the
    /// reason decides: an age shortfall waits a year, a service shortfall
    /// 3 months, anything else a month.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: impl Into<String>,
        employee_id: impl Into<String>,
        period: PayrollPeriod,
        eligible: bool,
        eligibility_date: Option<NaiveDate>,
        reason: impl Into<String>,
        age: u32,
        months_of_service: u32,
        checked_on: NaiveDate,
    ) -> Self {
        let reason = reason.into();
        let next_check_date = next_check_date(eligible, &reason, checked_on);
        Self {
            tenant_id: tenant_id.into(),
            employee_id: employee_id.into(),
            period,
            eligible,
            status: if eligible {
                EligibilityStatus::Eligible
            } else {
                EligibilityStatus::NotEligible
            },
            eligibility_date,
            reason,
            age,
            months_of_service,
            last_check_date: checked_on,
            next_check_date,
        }
    }
}

fn next_check_date(eligible: bool, reason: &str, checked_on: NaiveDate) -> NaiveDate {
    if eligible {
        return add_months(checked_on, 6);
    }
    let reason = reason.to_lowercase();
    if reason.contains("age") {
        add_months(checked_on, 12)
    } else if reason.contains("service") {
        add_months(checked_on, 3)
    } else {
        add_months(checked_on, 1)
    }
}

impl Record for EligibilityRecord {
    fn key(&self) -> String {
        format!("{}:{}", self.employee_id, self.period.key())
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}
