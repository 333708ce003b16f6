//! Condition evaluation for branching nodes.

use regex::Regex;

use crate::node::{ConditionConfig, ConditionOperator, ConditionRule};
use crate::template::interpolate;
use crate::variables::VariableEnvironment;

/// Parses a numeric operand. Unparsable input is treated as 0.
#[must_use]
pub fn coerce_number(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

/// Evaluates one `(variable, operator, value)` triple.
///
/// The left operand is the variable's rendering; the right operand is the
/// literal, interpolated first so conditions can compare two variables.
#[must_use]
pub fn evaluate(rule: &ConditionRule, env: &VariableEnvironment) -> bool {
    let left = env.get_string(&rule.variable);
    let right = interpolate(&rule.value, env);
    match rule.operator {
        ConditionOperator::Equals => left == right,
        ConditionOperator::NotEquals => left != right,
        ConditionOperator::Contains => left.contains(&right),
        ConditionOperator::GreaterThan => coerce_number(&left) > coerce_number(&right),
        ConditionOperator::LessThan => coerce_number(&left) < coerce_number(&right),
        ConditionOperator::Matches => match Regex::new(&right) {
            Ok(pattern) => pattern.is_match(&left),
            Err(error) => {
                tracing::warn!(pattern = %right, %error, "invalid condition regex");
                false
            }
        },
        ConditionOperator::Exists => env.is_present(&rule.variable),
    }
}

/// Picks the branch handle for a condition node: the first true rule's
/// handle, else the default handle (`"false"` when unset).
#[must_use]
pub fn select_handle(config: &ConditionConfig, env: &VariableEnvironment) -> String {
    config
        .conditions
        .iter()
        .find(|rule| evaluate(rule, env))
        .map(|rule| rule.output_handle.clone())
        .unwrap_or_else(|| {
            config
                .default_handle
                .clone()
                .unwrap_or_else(|| "false".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(variable: &str, operator: ConditionOperator, value: &str) -> ConditionRule {
        ConditionRule {
            variable: variable.to_string(),
            operator,
            value: value.to_string(),
            output_handle: "hit".to_string(),
        }
    }

    fn env() -> VariableEnvironment {
        let mut env = VariableEnvironment::new();
        env.set("age", json!("15"));
        env.set("name", json!("Ada Lovelace"));
        env.set("threshold", json!(18));
        env
    }

    #[test]
    fn numeric_comparison_coerces_operands() {
        assert!(evaluate(
            &rule("age", ConditionOperator::LessThan, "18"),
            &env()
        ));
        assert!(!evaluate(
            &rule("age", ConditionOperator::GreaterThan, "18"),
            &env()
        ));
    }

    #[test]
    fn unparsable_number_is_zero() {
        assert!(evaluate(
            &rule("name", ConditionOperator::LessThan, "1"),
            &env()
        ));
    }

    #[test]
    fn value_is_interpolated_before_comparison() {
        assert!(evaluate(
            &rule("age", ConditionOperator::LessThan, "{{threshold}}"),
            &env()
        ));
    }

    #[test]
    fn contains_and_regex() {
        assert!(evaluate(
            &rule("name", ConditionOperator::Contains, "Love"),
            &env()
        ));
        assert!(evaluate(
            &rule("name", ConditionOperator::Matches, "^Ada"),
            &env()
        ));
        assert!(!evaluate(
            &rule("name", ConditionOperator::Matches, "([unclosed"),
            &env()
        ));
    }

    #[test]
    fn exists_requires_non_empty() {
        let mut env = env();
        env.set("empty", json!(""));
        assert!(evaluate(&rule("name", ConditionOperator::Exists, ""), &env));
        assert!(!evaluate(&rule("empty", ConditionOperator::Exists, ""), &env));
        assert!(!evaluate(
            &rule("missing", ConditionOperator::Exists, ""),
            &env
        ));
    }

    #[test]
    fn fallthrough_selects_default_handle() {
        let config = ConditionConfig {
            conditions: vec![ConditionRule {
                variable: "age".to_string(),
                operator: ConditionOperator::GreaterThan,
                value: "18".to_string(),
                output_handle: "adult".to_string(),
            }],
            default_handle: Some("minor".to_string()),
        };
        assert_eq!(select_handle(&config, &env()), "minor");
    }

    #[test]
    fn fallthrough_without_default_is_false() {
        let config = ConditionConfig {
            conditions: vec![],
            default_handle: None,
        };
        assert_eq!(select_handle(&config, &env()), "false");
    }
}
