//! Compiled rule bases and their evaluation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};

use super::expr::Expr;
use super::fact::Fact;
use super::value::Value;

/// Comparison operators available to conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Field is null.
    IsNull,
    /// Field is not null.
    NotNull,
}

impl CompareOp {
    /// Parses an operator name.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "eq" => CompareOp::Eq,
            "ne" => CompareOp::Ne,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "is_null" => CompareOp::IsNull,
            "not_null" => CompareOp::NotNull,
            _ => return None,
        })
    }

    /// True for the operators that take no operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, CompareOp::IsNull | CompareOp::NotNull)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand (`is_null`, `not_null`).
    None,
    /// A literal.
    Literal(Value),
    /// Another field of the fact.
    Field(String),
}

/// A compiled condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Field tested.
    pub field: String,
    /// Operator.
    pub op: CompareOp,
    /// Operand.
    pub operand: Operand,
}

/// Where an action's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSource {
    /// A literal.
    Literal(Value),
    /// Another field of the fact.
    Field(String),
    /// An arithmetic expression.
    Expr(Expr),
}

/// A compiled action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Field written.
    pub target: String,
    /// Value source.
    pub source: ActionSource,
}

/// A compiled rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Rule name.
    pub name: String,
    /// Priority; higher runs first.
    pub salience: i32,
    /// Conditions that must all hold.
    pub conditions: Vec<Condition>,
    /// Actions applied in order when the rule fires.
    pub actions: Vec<Action>,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Names of the rules that fired, in firing order.
    pub fired: Vec<String>,
}

impl Condition {
    fn holds<F: Fact>(&self, fact: &F) -> Result<bool, String> {
        let left = fact.get(&self.field)?;
        let right = match &self.operand {
            Operand::None => Value::Null,
            Operand::Literal(value) => value.clone(),
            Operand::Field(name) => fact.get(name)?,
        };
        Ok(match self.op {
            CompareOp::IsNull => left.is_null(),
            CompareOp::NotNull => !left.is_null(),
            CompareOp::Eq => left.equals(&right)?,
            CompareOp::Ne => !left.equals(&right)?,
            // Ordering against a missing value never holds.
            _ if left.is_null() || right.is_null() => false,
            CompareOp::Lt => left.compare(&right)?.is_lt(),
            CompareOp::Lte => left.compare(&right)?.is_le(),
            CompareOp::Gt => left.compare(&right)?.is_gt(),
            CompareOp::Gte => left.compare(&right)?.is_ge(),
        })
    }
}

impl Action {
    fn apply<F: Fact>(&self, fact: &mut F) -> Result<(), String> {
        let value = match &self.source {
            ActionSource::Literal(value) => value.clone(),
            ActionSource::Field(name) => fact.get(name)?,
            ActionSource::Expr(expr) => {
                let lookup = |field: &str| fact.get(field);
                Value::Decimal(expr.evaluate(&lookup)?)
            }
        };
        fact.set(&self.target, value)
    }
}

/// The executable form of one rule definition.
///
/// Rules are held in firing order: salience descending, declaration order
/// among equal salience.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBase {
    /// Rule base name (the definition name).
    pub name: String,
    /// Rules in firing order.
    pub rules: Vec<Rule>,
    /// Modification time of the source definition.
    pub last_updated: DateTime<Utc>,
}

impl RuleBase {
    /// Evaluates every rule once, in order, against `fact`.
    ///
    /// Rules see the writes of earlier rules. The pass runs on a copy of
    /// the fact; `fact` is only updated if every rule succeeded, so on
    /// error it is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidFact`] naming the failing rule when a
    /// condition or action hits an unknown field, a type mismatch, a write
    /// to an input field, or an arithmetic failure.
    pub fn evaluate<F: Fact>(&self, fact: &mut F) -> EngineResult<Evaluation> {
        let mut working = fact.clone();
        let mut evaluation = Evaluation::default();

        for rule in &self.rules {
            let fire = rule
                .conditions
                .iter()
                .try_fold(true, |all, condition| {
                    Ok::<bool, String>(all && condition.holds(&working)?)
                })
                .map_err(|message| invalid_fact(&self.name, &rule.name, message))?;
            if !fire {
                continue;
            }
            for action in &rule.actions {
                action
                    .apply(&mut working)
                    .map_err(|message| invalid_fact(&self.name, &rule.name, message))?;
            }
            evaluation.fired.push(rule.name.clone());
        }

        *fact = working;
        Ok(evaluation)
    }
}

fn invalid_fact(base: &str, rule: &str, message: String) -> EngineError {
    EngineError::InvalidFact {
        rule: format!("{base}/{rule}"),
        message,
    }
}

/// Every rule base compiled by one reload, keyed by name.
#[derive(Debug, Clone)]
pub struct RuleSet {
    bases: BTreeMap<String, Arc<RuleBase>>,
    compiled_at: DateTime<Utc>,
    generation: u64,
}

impl RuleSet {
    pub(crate) fn new(bases: BTreeMap<String, Arc<RuleBase>>) -> Self {
        Self {
            bases,
            compiled_at: Utc::now(),
            generation: 0,
        }
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// The reload that activated this set; 0 if it was never activated.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Looks up a rule base.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RuleBaseNotFound`] if no base has that name.
    pub fn base(&self, name: &str) -> EngineResult<Arc<RuleBase>> {
        self.bases
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::RuleBaseNotFound {
                name: name.to_string(),
            })
    }

    /// Rule base names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.bases.keys().cloned().collect()
    }

    /// Number of rule bases.
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// True if the set holds no bases.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Total rules across all bases.
    pub fn rule_count(&self) -> usize {
        self.bases.values().map(|base| base.rules.len()).sum()
    }

    /// When the set was compiled.
    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compile::compile;
    use crate::rules::definition::RuleDefinition;
    use crate::rules::fact::EligibilityFact;
    use chrono::NaiveDate;

    fn base(text: &str) -> Arc<RuleBase> {
        compile(&[RuleDefinition::new("eligibility", text)])
            .unwrap()
            .base("eligibility")
            .unwrap()
    }

    fn create_test_fact() -> EligibilityFact {
        EligibilityFact {
            employee_id: "ind_001".to_string(),
            tenant_id: "acme".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 5, 1),
            hire_date: NaiveDate::from_ymd_opt(2025, 11, 1),
            rehire_date: None,
            employment_status: Some("active".to_string()),
            employment_type: Some("employee".to_string()),
            current_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            age: 25,
            months_of_service: 2,
            minimum_age: 21,
            minimum_service_months: 3,
            eligible: false,
            eligibility_date: None,
            eligibility_reason: String::new(),
        }
    }

    const ELIGIBILITY: &str = r#"
rules:
  - name: meets-all
    salience: 10
    when:
      - field: age
        op: gte
        to_field: minimum_age
      - field: months_of_service
        op: gte
        to_field: minimum_service_months
      - field: employment_status
        op: eq
        value: active
    then:
      - set: eligible
        value: true
      - set: eligibility_date
        from: current_date
      - set: eligibility_reason
        value: Meets all requirements
  - name: short-service
    when:
      - field: eligible
        op: eq
        value: false
      - field: months_of_service
        op: lt
        to_field: minimum_service_months
    then:
      - set: eligibility_reason
        value: Insufficient service
"#;

    #[test]
    fn test_later_rules_see_earlier_writes() {
        let base = base(ELIGIBILITY);

        let mut fact = create_test_fact();
        let evaluation = base.evaluate(&mut fact).unwrap();
        assert_eq!(evaluation.fired, vec!["short-service"]);
        assert!(!fact.eligible);
        assert_eq!(fact.eligibility_reason, "Insufficient service");

        let mut fact = create_test_fact();
        fact.months_of_service = 3;
        let evaluation = base.evaluate(&mut fact).unwrap();
        assert_eq!(evaluation.fired, vec!["meets-all"]);
        assert!(fact.eligible);
        assert_eq!(fact.eligibility_date, Some(fact.current_date));
    }

    #[test]
    fn test_rule_not_firing_is_not_an_error() {
        let base = base(concat!(
            "rules:\n",
            "  - name: never\n",
            "    when:\n",
            "      - field: age\n",
            "        op: gt\n",
            "        value: 200\n",
            "    then:\n",
            "      - set: eligible\n",
            "        value: true\n",
        ));
        let mut fact = create_test_fact();
        let before = fact.clone();
        let evaluation = base.evaluate(&mut fact).unwrap();
        assert!(evaluation.fired.is_empty());
        assert_eq!(fact, before);
    }

    #[test]
    fn test_failed_pass_leaves_fact_untouched() {
        let base = base(
            r#"
rules:
  - name: first
    salience: 2
    then:
      - set: eligible
        value: true
  - name: second
    salience: 1
    then:
      - set: age
        value: 99
"#,
        );
        let mut fact = create_test_fact();
        let before = fact.clone();
        match base.evaluate(&mut fact) {
            Err(EngineError::InvalidFact { rule, message }) => {
                assert_eq!(rule, "eligibility/second");
                assert!(message.contains("input field"));
            }
            other => panic!("Expected InvalidFact, got {other:?}"),
        }
        assert_eq!(fact, before);
    }

    #[test]
    fn test_unknown_field_in_condition_is_invalid_fact() {
        let base = base(concat!(
            "rules:\n",
            "  - name: r\n",
            "    when:\n",
            "      - field: salary\n",
            "        op: gt\n",
            "        value: 1\n",
            "    then:\n",
            "      - set: eligible\n",
            "        value: true\n",
        ));
        let mut fact = create_test_fact();
        assert!(matches!(
            base.evaluate(&mut fact),
            Err(EngineError::InvalidFact { .. })
        ));
    }

    #[test]
    fn test_ordering_against_null_does_not_hold() {
        let base = base(concat!(
            "rules:\n",
            "  - name: r\n",
            "    when:\n",
            "      - field: rehire_date\n",
            "        op: lt\n",
            "        value: '2030-01-01'\n",
            "    then:\n",
            "      - set: eligible\n",
            "        value: true\n",
        ));
        let mut fact = create_test_fact();
        base.evaluate(&mut fact).unwrap();
        assert!(!fact.eligible);
    }

    #[test]
    fn test_date_literal_comparison() {
        let base = base(concat!(
            "rules:\n",
            "  - name: r\n",
            "    when:\n",
            "      - field: hire_date\n",
            "        op: gte\n",
            "        value: '2025-01-01'\n",
            "    then:\n",
            "      - set: eligibility_reason\n",
            "        value: Recent hire\n",
        ));
        let mut fact = create_test_fact();
        base.evaluate(&mut fact).unwrap();
        assert_eq!(fact.eligibility_reason, "Recent hire");
    }

    #[test]
    fn test_type_mismatch_in_comparison_is_invalid_fact() {
        let base = base(concat!(
            "rules:\n",
            "  - name: r\n",
            "    when:\n",
            "      - field: age\n",
            "        op: gt\n",
            "        value: old\n",
            "    then:\n",
            "      - set: eligible\n",
            "        value: true\n",
        ));
        let mut fact = create_test_fact();
        match base.evaluate(&mut fact) {
            Err(EngineError::InvalidFact { message, .. }) => {
                assert_eq!(message, "cannot compare decimal with text");
            }
            other => panic!("Expected InvalidFact, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_set_lookup() {
        let set = compile(&[RuleDefinition::new("eligibility", ELIGIBILITY)]).unwrap();
        assert_eq!(set.names(), vec!["eligibility"]);
        assert!(matches!(
            set.base("deduction"),
            Err(EngineError::RuleBaseNotFound { .. })
        ));
    }
}
