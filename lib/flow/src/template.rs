//! `{{path}}` template interpolation.

use regex::Regex;
use std::sync::LazyLock;

use crate::variables::VariableEnvironment;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("valid placeholder pattern"));

/// Substitutes every `{{path}}` placeholder with the path's rendering in the
/// environment. Missing paths render empty. A string without placeholders is
/// returned unchanged, so interpolation is idempotent on delivered text.
#[must_use]
pub fn interpolate(input: &str, env: &VariableEnvironment) -> String {
    PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures<'_>| env.get_string(&caps[1]))
        .into_owned()
}

/// Interpolates an optional template, passing `None` through.
#[must_use]
pub fn interpolate_opt(input: Option<&str>, env: &VariableEnvironment) -> Option<String> {
    input.map(|text| interpolate(text, env))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env() -> VariableEnvironment {
        let mut env = VariableEnvironment::new();
        env.set("customer_name", json!("Ada"));
        env.set("order.total", json!(12.5));
        env
    }

    #[test]
    fn substitutes_placeholders() {
        assert_eq!(
            interpolate("Hi {{customer_name}}, total {{order.total}}", &env()),
            "Hi Ada, total 12.5"
        );
    }

    #[test]
    fn placeholder_free_string_is_unchanged() {
        let input = "no placeholders here";
        assert_eq!(interpolate(input, &env()), input);
    }

    #[test]
    fn missing_path_renders_empty() {
        assert_eq!(interpolate("[{{missing.path}}]", &env()), "[]");
    }

    #[test]
    fn whitespace_inside_braces_is_tolerated() {
        assert_eq!(interpolate("{{ customer_name }}", &env()), "Ada");
    }

    #[test]
    fn interpolation_is_idempotent_on_output() {
        let once = interpolate("Hi {{customer_name}}", &env());
        assert_eq!(interpolate(&once, &env()), once);
    }
}
