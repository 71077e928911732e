//! Credential resolver backed by environment variables.

use archit_core::config::CredentialRef;
use archit_core::credential::{CredentialResolver, SecretValue};
use archit_core::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Prefix of the variables credentials are read from.
pub const DEFAULT_PREFIX: &str = "ARCHIT_SECRET_";

/// Resolves `github-token` from `ARCHIT_SECRET_GITHUB_TOKEN`.
///
/// A value holding a JSON object resolves to a map secret.
pub struct EnvCredentialResolver {
    prefix: String,
    vars: HashMap<String, String>,
}

impl EnvCredentialResolver {
    /// Snapshot the current process environment.
    pub fn from_process_env() -> Self {
        Self::with_vars(std::env::vars().collect())
    }

    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            vars,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Variable name a credential is read from.
    pub fn variable_name(&self, reference: &CredentialRef) -> String {
        let name: String = reference
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, name)
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, reference: &CredentialRef) -> Result<SecretValue> {
        let variable = self.variable_name(reference);
        let value = self.vars.get(&variable).ok_or_else(|| {
            Error::NotFound(format!("credential '{}' (variable {})", reference, variable))
        })?;
        debug!(credential = %reference, %variable, "Resolved credential");

        match serde_json::from_str::<HashMap<String, String>>(value) {
            Ok(map) if value.trim_start().starts_with('{') => Ok(SecretValue::Map(map)),
            _ => Ok(SecretValue::String(value.clone())),
        }
    }
}
