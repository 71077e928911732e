//! Credential resolution abstraction.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::Result;
use crate::config::CredentialRef;

/// A secret value (can be a single string or key-value pairs).
#[derive(Clone)]
pub enum SecretValue {
    /// A single secret string.
    String(String),
    /// A map of key-value pairs.
    Map(HashMap<String, String>),
}

/// Key holding the access token in a map secret.
pub const TOKEN_KEY: &str = "token";

impl SecretValue {
    /// Access token held by the secret: the string itself, or the
    /// [`TOKEN_KEY`] entry of a map. Empty values count as absent.
    pub fn token(&self) -> Option<&str> {
        let token = match self {
            SecretValue::String(s) => Some(s.as_str()),
            SecretValue::Map(m) => m.get(TOKEN_KEY).map(String::as_str),
        };
        token.filter(|t| !t.trim().is_empty())
    }
}

// Never print secret material.
impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretValue::String(_) => write!(f, "SecretValue::String(***)"),
            SecretValue::Map(m) => write!(f, "SecretValue::Map({} keys)", m.len()),
        }
    }
}

/// Trait for credential backends, consulted at provisioning time only.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve a credential reference to its secret value.
    async fn resolve(&self, reference: &CredentialRef) -> Result<SecretValue>;
}
