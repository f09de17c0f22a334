//! Rule engine tests against the shipped rule definitions in
//! `config/rules/`.

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;

use contribution_engine::config::ConfigLoader;
use contribution_engine::error::EngineError;
use contribution_engine::rules::{
    CALCULATION_RULES, CalculationFact, ELIGIBILITY_RULES, EligibilityFact, RuleEngine, compile,
};

use common::*;

async fn shipped_engine() -> RuleEngine {
    let loader = ConfigLoader::load("./config").unwrap();
    RuleEngine::load(Arc::new(loader.rule_store())).await.unwrap()
}

fn eligibility_fact(age: u32, months: u32, status: Option<&str>) -> EligibilityFact {
    EligibilityFact {
        employee_id: "emp_001".to_string(),
        tenant_id: TENANT.to_string(),
        date_of_birth: None,
        hire_date: None,
        rehire_date: None,
        employment_status: status.map(str::to_string),
        employment_type: Some("employee".to_string()),
        current_date: date(2026, 1, 31),
        age,
        months_of_service: months,
        minimum_age: 21,
        minimum_service_months: 3,
        eligible: false,
        eligibility_date: None,
        eligibility_reason: String::new(),
    }
}

fn calculation_fact(match_type: &str, compensation: &str, percent: &str) -> CalculationFact {
    CalculationFact {
        employee_id: "emp_001".to_string(),
        annual_compensation: dec(compensation),
        eligible_compensation: dec(compensation),
        compensation_limit: dec("315000"),
        employee_contribution_percent: dec(percent),
        auto_enrollment_enabled: false,
        auto_enrollment_percent: dec("3"),
        employer_match_type: match_type.to_string(),
        employer_match_percent: dec("100"),
        employer_match_limit_percent: dec("4"),
        profit_sharing_percent: Decimal::ZERO,
        employment_status: Some("active".to_string()),
        age: 40,
        months_of_service: 24,
        employee_contribution: Decimal::ZERO,
        employer_contribution: Decimal::ZERO,
        profit_sharing_contribution: Decimal::ZERO,
        eligible: true,
        calculation_reason: String::new(),
    }
}

// =============================================================================
// SECTION 1: Loading
// =============================================================================

#[tokio::test]
async fn test_shipped_rules_compile() {
    let engine = shipped_engine().await;
    let set = engine.snapshot().unwrap();
    assert_eq!(
        set.names(),
        vec![CALCULATION_RULES.to_string(), ELIGIBILITY_RULES.to_string()]
    );
    assert_eq!(engine.generation(), 1);
}

#[test]
fn test_empty_definition_list_is_no_rules_configured() {
    assert!(matches!(compile(&[]), Err(EngineError::NoRulesConfigured)));
}

// =============================================================================
// SECTION 2: Eligibility
// =============================================================================

#[tokio::test]
async fn test_eligible_employee_gets_period_end_as_eligibility_date() {
    let engine = shipped_engine().await;
    let mut fact = eligibility_fact(30, 12, Some("active"));

    let evaluation = engine.evaluate(ELIGIBILITY_RULES, &mut fact).unwrap();

    assert!(fact.eligible);
    assert_eq!(fact.eligibility_date, Some(date(2026, 1, 31)));
    assert_eq!(evaluation.fired, vec!["meets-all-requirements".to_string()]);
}

#[tokio::test]
async fn test_ineligibility_reasons() {
    let engine = shipped_engine().await;
    let cases = [
        ((20, 12, Some("active")), "Below minimum age"),
        ((30, 2, Some("active")), "Insufficient service"),
        ((30, 12, Some("terminated")), "Employment status is not active"),
        ((30, 12, None), "Employment status is not active"),
    ];

    for ((age, months, status), reason) in cases {
        let mut fact = eligibility_fact(age, months, status);
        engine.evaluate(ELIGIBILITY_RULES, &mut fact).unwrap();
        assert!(!fact.eligible, "{reason}");
        assert_eq!(fact.eligibility_reason, reason);
        assert_eq!(fact.eligibility_date, None);
    }
}

// =============================================================================
// SECTION 3: Calculation
// =============================================================================

#[tokio::test]
async fn test_basic_match_is_capped_by_limit_percent() {
    let engine = shipped_engine().await;
    let mut fact = calculation_fact("basic", "50000", "6");

    engine.evaluate(CALCULATION_RULES, &mut fact).unwrap();

    assert_eq!(fact.employee_contribution, dec("3000.00"));
    // 100% of 3,000 capped at 4% of 50,000.
    assert_eq!(fact.employer_contribution, dec("2000.00"));
    assert_eq!(fact.calculation_reason, "Contributions calculated");
}

#[tokio::test]
async fn test_percentage_match_ignores_employee_deferral() {
    let engine = shipped_engine().await;
    let mut fact = calculation_fact("percentage", "50000", "0");
    fact.employer_match_percent = dec("3");

    engine.evaluate(CALCULATION_RULES, &mut fact).unwrap();

    assert_eq!(fact.employee_contribution, dec("0.00"));
    assert_eq!(fact.employer_contribution, dec("1500.00"));
}

#[tokio::test]
async fn test_profit_sharing_applies_when_configured() {
    let engine = shipped_engine().await;
    let mut fact = calculation_fact("none", "80000", "5");
    fact.profit_sharing_percent = dec("2.5");

    engine.evaluate(CALCULATION_RULES, &mut fact).unwrap();

    assert_eq!(fact.employee_contribution, dec("4000.00"));
    assert_eq!(fact.employer_contribution, Decimal::ZERO);
    assert_eq!(fact.profit_sharing_contribution, dec("2000.00"));
}

#[tokio::test]
async fn test_ineligible_fact_gets_no_amounts() {
    let engine = shipped_engine().await;
    let mut fact = calculation_fact("basic", "50000", "6");
    fact.eligible = false;

    engine.evaluate(CALCULATION_RULES, &mut fact).unwrap();

    assert_eq!(fact.employee_contribution, Decimal::ZERO);
    assert_eq!(fact.calculation_reason, "Employee is not eligible");
}
