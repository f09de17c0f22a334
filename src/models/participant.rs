//! Plan participant model.
//!
//! A [`Participant`] is an employee of a tenant as kept current by the
//! directory sync job and read by the eligibility stage.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::period::{PayrollPeriod, whole_months_between, whole_years_between};
use crate::storage::Record;

/// An employee enrolled (or enrollable) in a tenant's retirement plan.
///
/// # Example
///
/// ```
/// use contribution_engine::models::Participant;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let participant = Participant {
///     tenant_id: "acme".to_string(),
///     employee_id: "ind_001".to_string(),
///     first_name: Some("Ada".to_string()),
///     last_name: Some("Lovelace".to_string()),
///     date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10),
///     hire_date: NaiveDate::from_ymd_opt(2020, 3, 1),
///     rehire_date: None,
///     termination_date: None,
///     employment_status: Some("active".to_string()),
///     employment_type: Some("employee".to_string()),
///     annual_compensation: Decimal::new(85_000, 0),
///     employee_contribution_percent: None,
///     is_active: true,
/// };
///
/// assert_eq!(participant.service_start(), NaiveDate::from_ymd_opt(2020, 3, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Owning tenant.
    pub tenant_id: String,
    /// Directory individual id; unique per tenant.
    pub employee_id: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Date of birth, if known.
    pub date_of_birth: Option<NaiveDate>,
    /// Original hire date.
    pub hire_date: Option<NaiveDate>,
    /// Most recent rehire date; supersedes `hire_date` for service.
    pub rehire_date: Option<NaiveDate>,
    /// Termination date, if the employee has left.
    pub termination_date: Option<NaiveDate>,
    /// Employment status as reported by the directory (e.g. "active").
    pub employment_status: Option<String>,
    /// Employment type (e.g. "employee", "contractor").
    pub employment_type: Option<String>,
    /// Annualised compensation.
    pub annual_compensation: Decimal,
    /// Elected deferral rate, if the employee made an election.
    #[serde(default)]
    pub employee_contribution_percent: Option<Decimal>,
    /// Active flag from the directory.
    pub is_active: bool,
}

impl Participant {
    /// The date service is counted from: rehire date if present, else hire date.
    pub fn service_start(&self) -> Option<NaiveDate> {
        self.rehire_date.or(self.hire_date)
    }

    /// Age in whole years on `as_of`, or 0 when the birth date is unknown.
    pub fn age_on(&self, as_of: NaiveDate) -> u32 {
        self.date_of_birth
            .map(|dob| whole_years_between(dob, as_of))
            .unwrap_or(0)
    }

    /// Whole months of service on `as_of`, or 0 when no start date is known.
    pub fn months_of_service_on(&self, as_of: NaiveDate) -> u32 {
        self.service_start()
            .map(|start| whole_months_between(start, as_of))
            .unwrap_or(0)
    }

    /// True if the participant was employed at any point in `period`.
    ///
    /// A participant with no hire date is never active; one with no
    /// termination date is active from hire onwards.
    pub fn is_active_in(&self, period: &PayrollPeriod) -> bool {
        let Some(hired) = self.hire_date.or(self.rehire_date) else {
            return false;
        };
        if hired > period.end_date {
            return false;
        }
        match self.termination_date {
            Some(terminated) => terminated >= period.start_date || self.rehire_after(terminated),
            None => true,
        }
    }

    fn rehire_after(&self, terminated: NaiveDate) -> bool {
        self.rehire_date.is_some_and(|rehired| rehired > terminated)
    }
}

impl Record for Participant {
    fn key(&self) -> String {
        self.employee_id.clone()
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}
