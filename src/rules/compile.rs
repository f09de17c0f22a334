//! Compilation of rule definitions into a [`RuleSet`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

use super::base::{Action, ActionSource, CompareOp, Condition, Operand, Rule, RuleBase, RuleSet};
use super::definition::{ActionSpec, ConditionSpec, RuleDefinition, RuleDocument, RuleSpec};
use super::expr::Expr;
use super::value::Value;

/// Compiles every definition into one rule set.
///
/// Compilation is all-or-nothing: every definition is checked and all
/// diagnostics are reported together.
///
/// # Errors
///
/// - [`EngineError::NoRulesConfigured`] if `definitions` is empty.
/// - [`EngineError::RuleCompilation`] if any definition fails to parse or
///   validate, or two definitions share a name.
///
/// # Example
///
/// ```
/// use contribution_engine::rules::{compile, RuleDefinition};
///
/// let set = compile(&[RuleDefinition::new(
///     "eligibility",
///     "rules:\n  - name: always\n    then:\n      - set: eligible\n        value: true\n",
/// )])
/// .unwrap();
/// assert_eq!(set.names(), vec!["eligibility".to_string()]);
///
/// assert!(compile(&[]).is_err());
/// ```
pub fn compile(definitions: &[RuleDefinition]) -> EngineResult<RuleSet> {
    if definitions.is_empty() {
        return Err(EngineError::NoRulesConfigured);
    }

    let mut diagnostics = Vec::new();
    let mut bases = BTreeMap::new();

    for definition in definitions {
        if bases.contains_key(&definition.name) {
            diagnostics.push(format!("{}: duplicate rule definition name", definition.name));
            continue;
        }
        match compile_definition(definition) {
            Ok(base) => {
                bases.insert(definition.name.clone(), Arc::new(base));
            }
            Err(mut errors) => {
                diagnostics.append(&mut errors);
                // Reserve the name so a later duplicate is still reported.
                bases.insert(
                    definition.name.clone(),
                    Arc::new(RuleBase {
                        name: definition.name.clone(),
                        rules: Vec::new(),
                        last_updated: definition.last_updated,
                    }),
                );
            }
        }
    }

    if !diagnostics.is_empty() {
        return Err(EngineError::RuleCompilation { diagnostics });
    }

    Ok(RuleSet::new(bases))
}

fn compile_definition(definition: &RuleDefinition) -> Result<RuleBase, Vec<String>> {
    let name = &definition.name;
    if name.trim().is_empty() {
        return Err(vec!["rule definition has an empty name".to_string()]);
    }

    let document: RuleDocument = serde_yaml::from_str(&definition.rule_text)
        .map_err(|e| vec![format!("{name}: invalid rule document: {e}")])?;
    if document.rules.is_empty() {
        return Err(vec![format!("{name}: defines no rules")]);
    }

    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(document.rules.len());

    for spec in &document.rules {
        if !seen.insert(spec.name.as_str()) {
            diagnostics.push(format!("{name}/{}: duplicate rule name", spec.name));
            continue;
        }
        match compile_rule(spec) {
            Ok(rule) => rules.push(rule),
            Err(errors) => diagnostics.extend(
                errors
                    .into_iter()
                    .map(|e| format!("{name}/{}: {e}", spec.name)),
            ),
        }
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    // Stable sort keeps declaration order among equal salience.
    rules.sort_by(|a, b| b.salience.cmp(&a.salience));

    Ok(RuleBase {
        name: name.clone(),
        rules,
        last_updated: definition.last_updated,
    })
}

fn compile_rule(spec: &RuleSpec) -> Result<Rule, Vec<String>> {
    let mut errors = Vec::new();

    if spec.name.trim().is_empty() {
        errors.push("rule has an empty name".to_string());
    }

    let conditions: Vec<Condition> = spec
        .when
        .iter()
        .filter_map(|c| compile_condition(c).map_err(|e| errors.push(e)).ok())
        .collect();

    if spec.then.is_empty() {
        errors.push("rule has no actions".to_string());
    }
    let actions: Vec<Action> = spec
        .then
        .iter()
        .filter_map(|a| compile_action(a).map_err(|e| errors.push(e)).ok())
        .collect();

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Rule {
        name: spec.name.clone(),
        salience: spec.salience,
        conditions,
        actions,
    })
}

fn compile_condition(spec: &ConditionSpec) -> Result<Condition, String> {
    let op = CompareOp::parse(&spec.op)
        .ok_or_else(|| format!("unknown operator '{}' on field '{}'", spec.op, spec.field))?;

    let operand = match (&spec.value, &spec.to_field) {
        (Some(_), Some(_)) => {
            return Err(format!(
                "condition on '{}' has both value and to_field",
                spec.field
            ));
        }
        (Some(literal), None) => Operand::Literal(Value::from_yaml(literal)?),
        (None, Some(field)) => Operand::Field(field.clone()),
        (None, None) => Operand::None,
    };

    match (op.is_unary(), &operand) {
        (true, Operand::None) | (false, Operand::Literal(_) | Operand::Field(_)) => {}
        (true, _) => {
            return Err(format!(
                "operator '{}' on '{}' takes no operand",
                spec.op, spec.field
            ));
        }
        (false, Operand::None) => {
            return Err(format!(
                "operator '{}' on '{}' needs value or to_field",
                spec.op, spec.field
            ));
        }
    }

    Ok(Condition {
        field: spec.field.clone(),
        op,
        operand,
    })
}

fn compile_action(spec: &ActionSpec) -> Result<Action, String> {
    let source = match (&spec.value, &spec.from, &spec.expr) {
        (Some(literal), None, None) => ActionSource::Literal(Value::from_yaml(literal)?),
        (None, Some(field), None) => ActionSource::Field(field.clone()),
        (None, None, Some(expr)) => ActionSource::Expr(
            Expr::parse(expr).map_err(|e| format!("expression for '{}': {e}", spec.set))?,
        ),
        _ => {
            return Err(format!(
                "action on '{}' needs exactly one of value, from, expr",
                spec.set
            ));
        }
    };

    Ok(Action {
        target: spec.set.clone(),
        source,
    })
}
