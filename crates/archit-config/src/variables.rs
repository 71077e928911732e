//! Variable interpolation for architecture documents.
//!
//! Supports variables like:
//! - `${env.VAR_NAME}` - Environment variable
//! - `${name}` - Custom variable (from `--var name=value`)
//!
//! Interpolation runs over every string leaf of the parsed tree before
//! decoding, so variables can stand in for any scalar value. Substitution is
//! plain text in one pass: a substituted value is never expanded again and
//! always stays a string. There are no expressions, defaults or conditionals.

use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::{ConfigError, ConfigResult};

/// Variables available for interpolation.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    /// Environment variables
    pub env: HashMap<String, String>,
    /// Custom variables defined by the user
    pub custom: HashMap<String, String>,
}

// Regex for matching ${...} variables
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)?)\}").unwrap()
});

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate environment variables from the current process environment.
    pub fn populate_env(&mut self) {
        for (key, value) in std::env::vars() {
            self.env.insert(key, value);
        }
    }

    /// Add a custom variable.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.custom.insert(name.to_string(), value.into());
    }

    /// Resolve a variable name to its value.
    pub fn resolve(&self, var_name: &str) -> Option<String> {
        let parts: Vec<&str> = var_name.split('.').collect();

        match parts.as_slice() {
            ["env", name] => self.env.get(*name).cloned(),
            [name] => self.custom.get(*name).cloned(),
            _ => None,
        }
    }

    /// Interpolate all variables in a string.
    /// Unknown variables are left in place.
    pub fn interpolate(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let var_name = &caps[1];
                self.resolve(var_name)
                    .unwrap_or_else(|| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// Names referenced in `input` that this context cannot resolve.
    pub fn unresolved(&self, input: &str) -> Vec<String> {
        VAR_REGEX
            .captures_iter(input)
            .map(|caps| caps[1].to_string())
            .filter(|name| self.resolve(name).is_none())
            .collect()
    }

    /// Interpolate every string in a tree in place.
    ///
    /// Fails listing every unresolved reference; map keys are left alone.
    pub fn interpolate_tree(&self, tree: &mut Value) -> ConfigResult<()> {
        let mut missing = BTreeSet::new();
        self.walk(tree, &mut missing);

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::UnresolvedVariables(missing.into_iter().collect()))
        }
    }

    fn walk(&self, value: &mut Value, missing: &mut BTreeSet<String>) {
        match value {
            Value::String(s) => {
                missing.extend(self.unresolved(s));
                if s.contains("${") {
                    *s = self.interpolate(s);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, missing);
                }
            }
            Value::Object(map) => {
                for item in map.values_mut() {
                    self.walk(item, missing);
                }
            }
            _ => {}
        }
    }
}

/// Builder for creating VariableContext.
pub struct VariableContextBuilder {
    ctx: VariableContext,
}

impl VariableContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: VariableContext::new(),
        }
    }

    /// Take every variable of the current process environment.
    pub fn with_process_env(mut self) -> Self {
        self.ctx.populate_env();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.env.insert(key.into(), value.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ctx.custom.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> VariableContext {
        self.ctx
    }
}

impl Default for VariableContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_variables() {
        let ctx = VariableContextBuilder::new()
            .with_env("MY_VAR", "hello")
            .with_env("ANOTHER", "world")
            .build();

        let result = ctx.interpolate("${env.MY_VAR} ${env.ANOTHER}!");
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_custom_variables() {
        let mut ctx = VariableContext::new();
        ctx.set("stage", "prod");
        ctx.set("owner", "acme");

        let result = ctx.interpolate("${owner}-web-${stage}");
        assert_eq!(result, "acme-web-prod");
    }

    #[test]
    fn test_unknown_variable_preserved() {
        let ctx = VariableContext::new();
        let result = ctx.interpolate("Unknown: ${unknown.var}");
        assert_eq!(result, "Unknown: ${unknown.var}");
        assert_eq!(ctx.unresolved("${a} ${env.B}"), vec!["a", "env.B"]);
    }

    #[test]
    fn test_interpolate_tree() {
        let ctx = VariableContextBuilder::new()
            .with_env("GITHUB_OWNER", "acme")
            .with_custom("repo", "web")
            .build();
        let mut tree = json!({
            "repo": {"kind": "External", "name": "${repo}", "owner": "${env.GITHUB_OWNER}"},
            "list": ["${repo}-a", 3, true],
            "${repo}": "key untouched"
        });

        ctx.interpolate_tree(&mut tree).unwrap();
        assert_eq!(tree["repo"]["name"], "web");
        assert_eq!(tree["repo"]["owner"], "acme");
        assert_eq!(tree["list"][0], "web-a");
        assert_eq!(tree["list"][1], 3);
        assert!(tree.get("${repo}").is_some());
    }

    #[test]
    fn test_interpolate_tree_reports_all_unresolved() {
        let ctx = VariableContext::new();
        let mut tree = json!({"a": "${env.TOKEN}", "b": ["${name}", "${env.TOKEN}"]});

        match ctx.interpolate_tree(&mut tree) {
            Err(ConfigError::UnresolvedVariables(names)) => {
                assert_eq!(names, vec!["env.TOKEN".to_string(), "name".to_string()]);
            }
            other => panic!("expected unresolved variables, got {:?}", other),
        }
    }

    #[test]
    fn test_substitution_stays_scalar() {
        let ctx = VariableContextBuilder::new()
            .with_custom("inner", "${env.SECRET}")
            .with_custom("count", "3")
            .with_custom("block", "{kind: Hosted}")
            .build();
        let mut tree = json!({"a": "${inner}", "b": "${count}", "c": "${block}"});

        ctx.interpolate_tree(&mut tree).unwrap();
        assert_eq!(tree["a"], "${env.SECRET}");
        assert_eq!(tree["b"], "3");
        assert_eq!(tree["c"], "{kind: Hosted}");
    }

    #[test]
    fn test_nested_braces() {
        let ctx = VariableContextBuilder::new().with_custom("sha", "abc123").build();

        let result = ctx.interpolate(r#"{"sha": "${sha}"}"#);
        assert_eq!(result, r#"{"sha": "abc123"}"#);
    }
}
