//! Facts evaluated by rule bases.
//!
//! A [`Fact`] exposes its fields by name so compiled rules can read inputs
//! and write derived results without knowing the concrete type. Only
//! derived fields accept writes.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::value::Value;

/// A mutable record a rule base can read and update by field name.
pub trait Fact: Clone + Send + Sync {
    /// Name of the fact type, for diagnostics.
    fn kind(&self) -> &'static str;

    /// Reads a field; unknown fields are an error.
    fn get(&self, field: &str) -> Result<Value, String>;

    /// Writes a derived field.
    ///
    /// Unknown fields, input fields and values of the wrong type are errors.
    fn set(&mut self, field: &str, value: Value) -> Result<(), String>;
}

fn unknown(kind: &str, field: &str) -> String {
    format!("{kind} has no field '{field}'")
}

fn read_only(kind: &str, field: &str) -> String {
    format!("{kind}.{field} is an input field and cannot be set")
}

fn mismatch(kind: &str, field: &str, expected: &str, value: &Value) -> String {
    format!(
        "{kind}.{field} expects {expected}, got {}",
        value.type_name()
    )
}

fn expect_bool(kind: &str, field: &str, value: Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(mismatch(kind, field, "bool", &other)),
    }
}

fn expect_decimal(kind: &str, field: &str, value: Value) -> Result<Decimal, String> {
    match value {
        Value::Decimal(d) => Ok(d),
        other => Err(mismatch(kind, field, "decimal", &other)),
    }
}

fn expect_text(kind: &str, field: &str, value: Value) -> Result<String, String> {
    match value {
        Value::Text(text) => Ok(text),
        other => Err(mismatch(kind, field, "text", &other)),
    }
}

fn expect_optional_date(
    kind: &str,
    field: &str,
    value: Value,
) -> Result<Option<NaiveDate>, String> {
    match value {
        Value::Date(date) => Ok(Some(date)),
        Value::Null => Ok(None),
        other => Err(mismatch(kind, field, "date", &other)),
    }
}

/// Inputs and derived results of an eligibility evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityFact {
    /// Participant id.
    pub employee_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// Original hire date.
    pub hire_date: Option<NaiveDate>,
    /// Most recent rehire date.
    pub rehire_date: Option<NaiveDate>,
    /// Employment status.
    pub employment_status: Option<String>,
    /// Employment type.
    pub employment_type: Option<String>,
    /// Evaluation date.
    pub current_date: NaiveDate,
    /// Age in whole years on `current_date`.
    pub age: u32,
    /// Whole months of service on `current_date`.
    pub months_of_service: u32,
    /// Plan minimum age.
    pub minimum_age: u32,
    /// Plan minimum service.
    pub minimum_service_months: u32,
    /// Derived: eligibility decision.
    pub eligible: bool,
    /// Derived: date eligibility took effect.
    pub eligibility_date: Option<NaiveDate>,
    /// Derived: explanation.
    pub eligibility_reason: String,
}

impl Fact for EligibilityFact {
    fn kind(&self) -> &'static str {
        "EligibilityFact"
    }

    fn get(&self, field: &str) -> Result<Value, String> {
        Ok(match field {
            "employee_id" => Value::from(self.employee_id.as_str()),
            "tenant_id" => Value::from(self.tenant_id.as_str()),
            "date_of_birth" => Value::from(self.date_of_birth),
            "hire_date" => Value::from(self.hire_date),
            "rehire_date" => Value::from(self.rehire_date),
            "employment_status" => Value::from(self.employment_status.clone()),
            "employment_type" => Value::from(self.employment_type.clone()),
            "current_date" => Value::from(self.current_date),
            "age" => Value::from(self.age),
            "months_of_service" => Value::from(self.months_of_service),
            "minimum_age" => Value::from(self.minimum_age),
            "minimum_service_months" => Value::from(self.minimum_service_months),
            "eligible" => Value::from(self.eligible),
            "eligibility_date" => Value::from(self.eligibility_date),
            "eligibility_reason" => Value::from(self.eligibility_reason.as_str()),
            other => return Err(unknown(self.kind(), other)),
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), String> {
        let kind = self.kind();
        match field {
            "eligible" => self.eligible = expect_bool(kind, field, value)?,
            "eligibility_date" => self.eligibility_date = expect_optional_date(kind, field, value)?,
            "eligibility_reason" => self.eligibility_reason = expect_text(kind, field, value)?,
            other => {
                self.get(other)?;
                return Err(read_only(kind, other));
            }
        }
        Ok(())
    }
}

/// Inputs and derived results of a contribution calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationFact {
    /// Participant id.
    pub employee_id: String,
    /// Annual compensation.
    pub annual_compensation: Decimal,
    /// Compensation contributions are based on.
    pub eligible_compensation: Decimal,
    /// Plan compensation cap.
    pub compensation_limit: Decimal,
    /// Effective deferral rate (election, else auto-enrollment rate).
    pub employee_contribution_percent: Decimal,
    /// Plan auto-enrollment flag.
    pub auto_enrollment_enabled: bool,
    /// Plan auto-enrollment rate.
    pub auto_enrollment_percent: Decimal,
    /// `basic`, `percentage` or `none`.
    pub employer_match_type: String,
    /// Match percentage.
    pub employer_match_percent: Decimal,
    /// Match cap as a percentage of compensation.
    pub employer_match_limit_percent: Decimal,
    /// Profit-sharing percentage.
    pub profit_sharing_percent: Decimal,
    /// Employment status.
    pub employment_status: Option<String>,
    /// Age in whole years.
    pub age: u32,
    /// Months of service.
    pub months_of_service: u32,
    /// Derived: employee deferral amount.
    pub employee_contribution: Decimal,
    /// Derived: employer match amount.
    pub employer_contribution: Decimal,
    /// Derived: profit-sharing amount.
    pub profit_sharing_contribution: Decimal,
    /// Derived: whether contributions apply.
    pub eligible: bool,
    /// Derived: explanation.
    pub calculation_reason: String,
}

impl Fact for CalculationFact {
    fn kind(&self) -> &'static str {
        "CalculationFact"
    }

    fn get(&self, field: &str) -> Result<Value, String> {
        Ok(match field {
            "employee_id" => Value::from(self.employee_id.as_str()),
            "annual_compensation" => Value::from(self.annual_compensation),
            "eligible_compensation" => Value::from(self.eligible_compensation),
            "compensation_limit" => Value::from(self.compensation_limit),
            "employee_contribution_percent" => Value::from(self.employee_contribution_percent),
            "auto_enrollment_enabled" => Value::from(self.auto_enrollment_enabled),
            "auto_enrollment_percent" => Value::from(self.auto_enrollment_percent),
            "employer_match_type" => Value::from(self.employer_match_type.as_str()),
            "employer_match_percent" => Value::from(self.employer_match_percent),
            "employer_match_limit_percent" => Value::from(self.employer_match_limit_percent),
            "profit_sharing_percent" => Value::from(self.profit_sharing_percent),
            "employment_status" => Value::from(self.employment_status.clone()),
            "age" => Value::from(self.age),
            "months_of_service" => Value::from(self.months_of_service),
            "employee_contribution" => Value::from(self.employee_contribution),
            "employer_contribution" => Value::from(self.employer_contribution),
            "profit_sharing_contribution" => Value::from(self.profit_sharing_contribution),
            "eligible" => Value::from(self.eligible),
            "calculation_reason" => Value::from(self.calculation_reason.as_str()),
            other => return Err(unknown(self.kind(), other)),
        })
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), String> {
        let kind = self.kind();
        match field {
            "employee_contribution" => {
                self.employee_contribution = expect_decimal(kind, field, value)?
            }
            "employer_contribution" => {
                self.employer_contribution = expect_decimal(kind, field, value)?
            }
            "profit_sharing_contribution" => {
                self.profit_sharing_contribution = expect_decimal(kind, field, value)?
            }
            "eligible" => self.eligible = expect_bool(kind, field, value)?,
            "calculation_reason" => self.calculation_reason = expect_text(kind, field, value)?,
            other => {
                self.get(other)?;
                return Err(read_only(kind, other));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_fact() -> EligibilityFact {
        EligibilityFact {
            employee_id: "ind_001".to_string(),
            tenant_id: "acme".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            rehire_date: None,
            employment_status: Some("active".to_string()),
            employment_type: None,
            current_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            age: 36,
            months_of_service: 72,
            minimum_age: 21,
            minimum_service_months: 1,
            eligible: false,
            eligibility_date: None,
            eligibility_reason: String::new(),
        }
    }

    #[test]
    fn test_get_inputs() {
        let fact = create_test_fact();
        assert_eq!(fact.get("age").unwrap(), Value::Decimal(Decimal::from(36)));
        assert_eq!(fact.get("rehire_date").unwrap(), Value::Null);
        assert_eq!(fact.get("employment_type").unwrap(), Value::Null);
        assert_eq!(
            fact.get("employment_status").unwrap(),
            Value::Text("active".to_string())
        );
    }

    #[test]
    fn test_get_unknown_field() {
        let err = create_test_fact().get("salary").unwrap_err();
        assert_eq!(err, "EligibilityFact has no field 'salary'");
    }

    #[test]
    fn test_set_derived_fields() {
        let mut fact = create_test_fact();
        fact.set("eligible", Value::Bool(true)).unwrap();
        fact.set("eligibility_date", Value::Date(fact.current_date))
            .unwrap();
        fact.set("eligibility_reason", Value::from("Meets requirements"))
            .unwrap();
        assert!(fact.eligible);
        assert_eq!(fact.eligibility_date, Some(fact.current_date));
        assert_eq!(fact.eligibility_reason, "Meets requirements");
    }

    #[test]
    fn test_set_input_field_is_rejected() {
        let err = create_test_fact()
            .set("age", Value::Decimal(Decimal::ONE))
            .unwrap_err();
        assert_eq!(err, "EligibilityFact.age is an input field and cannot be set");
    }

    #[test]
    fn test_set_unknown_field_is_rejected() {
        let err = create_test_fact()
            .set("bonus", Value::Bool(true))
            .unwrap_err();
        assert_eq!(err, "EligibilityFact has no field 'bonus'");
    }

    #[test]
    fn test_set_wrong_type_is_rejected() {
        let err = create_test_fact()
            .set("eligible", Value::from("yes"))
            .unwrap_err();
        assert_eq!(err, "EligibilityFact.eligible expects bool, got text");
    }

    #[test]
    fn test_calculation_fact_round_trips_derived_decimal() {
        let mut fact = CalculationFact {
            employee_id: "ind_001".to_string(),
            annual_compensation: Decimal::from(85_000),
            eligible_compensation: Decimal::from(85_000),
            compensation_limit: Decimal::from(315_000),
            employee_contribution_percent: Decimal::from(5),
            auto_enrollment_enabled: false,
            auto_enrollment_percent: Decimal::from(3),
            employer_match_type: "basic".to_string(),
            employer_match_percent: Decimal::from(50),
            employer_match_limit_percent: Decimal::from(6),
            profit_sharing_percent: Decimal::ZERO,
            employment_status: None,
            age: 36,
            months_of_service: 72,
            employee_contribution: Decimal::ZERO,
            employer_contribution: Decimal::ZERO,
            profit_sharing_contribution: Decimal::ZERO,
            eligible: true,
            calculation_reason: String::new(),
        };
        fact.set("employee_contribution", Value::Decimal(Decimal::from(4250)))
            .unwrap();
        assert_eq!(
            fact.get("employee_contribution").unwrap(),
            Value::Decimal(Decimal::from(4250))
        );
        assert!(fact.set("annual_compensation", Value::Decimal(Decimal::ONE)).is_err());
    }
}
