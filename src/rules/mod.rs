//! Dynamic rule engine.
//!
//! Rule definitions are YAML documents of salience-ordered rules, each a
//! list of conditions over fact fields and a list of actions writing
//! derived fields. [`compile`] turns a full set of definitions into a
//! [`RuleSet`] holding one [`RuleBase`] per definition name, and
//! [`RuleEngine`] keeps the active set hot-swappable behind an `Arc`.
//!
//! ```yaml
//! rules:
//!   - name: meets-minimum-age
//!     salience: 10          # higher runs first; ties keep declaration order
//!     when:                 # all conditions must hold (empty = always)
//!       - field: age
//!         op: gte           # eq | ne | lt | lte | gt | gte | is_null | not_null
//!         to_field: minimum_age
//!     then:
//!       - set: eligible
//!         value: true
//!       - set: employee_contribution
//!         expr: "round(eligible_compensation * employee_contribution_percent / 100, 2)"
//! ```

mod base;
mod compile;
mod definition;
mod engine;
mod expr;
mod fact;
mod store;
mod value;

pub use base::{
    Action, ActionSource, CompareOp, Condition, Evaluation, Operand, Rule, RuleBase, RuleSet,
};
pub use compile::compile;
pub use definition::{ActionSpec, ConditionSpec, RuleDefinition, RuleDocument, RuleSpec};
pub use engine::{ReloadSummary, RuleEngine};
pub use expr::{BinaryOp, Expr, Function};
pub use fact::{CalculationFact, EligibilityFact, Fact};
pub use store::{FileRuleStore, InMemoryRuleStore, RuleStore};
pub use value::Value;

/// Rule base evaluated by the eligibility stage.
pub const ELIGIBILITY_RULES: &str = "eligibility";

/// Rule base evaluated by the calculation stage.
pub const CALCULATION_RULES: &str = "calculation";
