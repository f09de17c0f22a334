//! Tenant plan reference data.
//!
//! A [`TenantPlan`] carries the per-tenant plan configuration that the
//! eligibility and calculation stages feed into their facts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the employer matches employee contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// A percentage of the employee's own contribution.
    Basic,
    /// A percentage of eligible compensation.
    Percentage,
    /// No employer match.
    None,
}

impl MatchType {
    /// The text value exposed to rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Basic => "basic",
            MatchType::Percentage => "percentage",
            MatchType::None => "none",
        }
    }
}

/// Plan entry requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEligibility {
    /// Minimum age in years.
    pub minimum_age: u32,
    /// Minimum months of service.
    pub minimum_service_months: u32,
}

/// Employee deferral settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeContributionConfig {
    /// Whether employees without an election are auto-enrolled.
    pub auto_enrollment_enabled: bool,
    /// Deferral rate applied on auto-enrollment.
    pub auto_enrollment_percent: Decimal,
    /// Highest deferral rate accepted.
    pub max_percent: Decimal,
}

impl Default for EmployeeContributionConfig {
    fn default() -> Self {
        Self {
            auto_enrollment_enabled: false,
            auto_enrollment_percent: Decimal::new(3, 0),
            max_percent: Decimal::new(100, 0),
        }
    }
}

/// Employer match rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployerMatchRule {
    /// How the match is computed.
    pub match_type: MatchType,
    /// Match percentage (of contribution or compensation, per `match_type`).
    pub match_percent: Decimal,
    /// Cap on the match as a percentage of compensation.
    pub limit_percent: Decimal,
}

/// Per-tenant plan configuration.
///
/// # Example
///
/// ```
/// use contribution_engine::models::{
///     EmployeeContributionConfig, EmployerMatchRule, MatchType, PlanEligibility, TenantPlan,
/// };
/// use rust_decimal::Decimal;
///
/// let plan = TenantPlan {
///     tenant_id: "acme".to_string(),
///     eligibility: PlanEligibility { minimum_age: 21, minimum_service_months: 1 },
///     employee_contribution: EmployeeContributionConfig::default(),
///     employer_match: Some(EmployerMatchRule {
///         match_type: MatchType::Basic,
///         match_percent: Decimal::new(50, 0),
///         limit_percent: Decimal::new(6, 0),
///     }),
///     profit_sharing_percent: Decimal::ZERO,
///     compensation_limit: TenantPlan::DEFAULT_COMPENSATION_LIMIT,
/// };
///
/// assert_eq!(plan.match_type(), MatchType::Basic);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantPlan {
    /// Owning tenant.
    pub tenant_id: String,
    /// Entry requirements.
    pub eligibility: PlanEligibility,
    /// Employee deferral settings.
    #[serde(default)]
    pub employee_contribution: EmployeeContributionConfig,
    /// Employer match; absent means no match.
    #[serde(default)]
    pub employer_match: Option<EmployerMatchRule>,
    /// Profit-sharing contribution as a percentage of compensation.
    #[serde(default)]
    pub profit_sharing_percent: Decimal,
    /// Annual compensation cap used for contributions.
    #[serde(default = "default_compensation_limit")]
    pub compensation_limit: Decimal,
}

fn default_compensation_limit() -> Decimal {
    TenantPlan::DEFAULT_COMPENSATION_LIMIT
}

impl TenantPlan {
    /// Statutory annual compensation limit.
    pub const DEFAULT_COMPENSATION_LIMIT: Decimal = Decimal::from_parts(315_000, 0, 0, false, 0);

    /// The effective match type; [`MatchType::None`] when no rule is set.
    pub fn match_type(&self) -> MatchType {
        self.employer_match
            .as_ref()
            .map(|rule| rule.match_type)
            .unwrap_or(MatchType::None)
    }
}
