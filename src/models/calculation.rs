//! Calculation stage output.
//!
//! A [`CalculationResult`] holds the contribution amounts derived for one
//! eligible participant in one period, plus the totals computed from them.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::period::PayrollPeriod;
use crate::storage::Record;

/// Outcome of a contribution calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationStatus {
    /// Amounts were computed.
    Success,
    /// Rules marked the participant as not eligible for contributions.
    NotEligible,
}

/// The three contribution components derived by the calculation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContributionAmounts {
    /// Employee deferral.
    pub employee: Decimal,
    /// Employer match.
    pub employer: Decimal,
    /// Profit-sharing contribution.
    pub profit_sharing: Decimal,
}

impl ContributionAmounts {
    /// Sum of all components.
    pub fn total(&self) -> Decimal {
        self.employee + self.employer + self.profit_sharing
    }
}

/// The persisted contribution calculation for one participant and period.
///
/// # Example
///
/// ```
/// use contribution_engine::models::{CalculationResult, ContributionAmounts, PayrollPeriod};
/// use chrono::{NaiveDate, Utc};
/// use rust_decimal::Decimal;
///
/// let period = PayrollPeriod::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
/// )
/// .unwrap();
/// let result = CalculationResult::success(
///     "acme",
///     "ind_001",
///     period,
///     Decimal::new(100_000, 0),
///     ContributionAmounts {
///         employee: Decimal::new(5_000, 0),
///         employer: Decimal::new(2_500, 0),
///         profit_sharing: Decimal::ZERO,
///     },
///     "Calculated",
///     Utc::now(),
/// );
///
/// assert_eq!(result.calculation_id, "ind_001:2026-01-01:2026-01-31");
/// assert_eq!(result.total_contribution, Decimal::new(7_500, 0));
/// assert_eq!(result.total_contribution_percent, Decimal::new(750, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Deterministic id, `employee:start:end`.
    pub calculation_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Participant id.
    pub employee_id: String,
    /// Period calculated for.
    pub period: PayrollPeriod,
    /// Calculation outcome.
    pub status: CalculationStatus,
    /// Compensation the amounts were derived from.
    pub eligible_compensation: Decimal,
    /// Derived components.
    pub amounts: ContributionAmounts,
    /// Sum of `amounts`.
    pub total_contribution: Decimal,
    /// `total_contribution` as a percentage of compensation, 2 dp.
    pub total_contribution_percent: Decimal,
    /// Rule-supplied explanation.
    pub reason: String,
    /// When the calculation ran.
    pub calculated_at: DateTime<Utc>,
}

impl CalculationResult {
    /// Builds a successful result and derives its totals.
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        tenant_id: impl Into<String>,
        employee_id: impl Into<String>,
        period: PayrollPeriod,
        eligible_compensation: Decimal,
        amounts: ContributionAmounts,
        reason: impl Into<String>,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        let employee_id = employee_id.into();
        let total_contribution = amounts.total();
        Self {
            calculation_id: calculation_id(&employee_id, &period),
            tenant_id: tenant_id.into(),
            employee_id,
            period,
            status: CalculationStatus::Success,
            eligible_compensation,
            amounts,
            total_contribution,
            total_contribution_percent: percent_of(total_contribution, eligible_compensation),
            reason: reason.into(),
            calculated_at,
        }
    }

    /// Builds a not-eligible result with zero amounts.
    pub fn not_eligible(
        tenant_id: impl Into<String>,
        employee_id: impl Into<String>,
        period: PayrollPeriod,
        eligible_compensation: Decimal,
        reason: impl Into<String>,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        let employee_id = employee_id.into();
        Self {
            calculation_id: calculation_id(&employee_id, &period),
            tenant_id: tenant_id.into(),
            employee_id,
            period,
            status: CalculationStatus::NotEligible,
            eligible_compensation,
            amounts: ContributionAmounts::default(),
            total_contribution: Decimal::ZERO,
            total_contribution_percent: Decimal::ZERO,
            reason: reason.into(),
            calculated_at,
        }
    }

    /// True if the calculation produced amounts.
    pub fn is_success(&self) -> bool {
        self.status == CalculationStatus::Success
    }
}

/// Deterministic calculation id for an employee and period.
pub fn calculation_id(employee_id: &str, period: &PayrollPeriod) -> String {
    format!("{}:{}", employee_id, period.key())
}

/// `amount * 100 / base` rounded half-up to 2 dp; zero when `base` is zero.
pub fn percent_of(amount: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        return Decimal::ZERO;
    }
    (amount * Decimal::ONE_HUNDRED / base)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Record for CalculationResult {
    fn key(&self) -> String {
        self.calculation_id.clone()
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}
