//! Identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a service in the services list.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The role a deployable plays in the architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Pipeline that deploys the whole architecture.
    Architecture,
    Site,
    Database,
    Application,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Architecture => write!(f, "architecture"),
            Role::Site => write!(f, "site"),
            Role::Database => write!(f, "db"),
            Role::Application => write!(f, "app"),
        }
    }
}

/// Identifies one deployable: the architecture pipeline, the site, or a
/// service's database or application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeployableId {
    pub service: Option<ServiceId>,
    pub role: Role,
}

impl DeployableId {
    pub fn architecture() -> Self {
        Self {
            service: None,
            role: Role::Architecture,
        }
    }

    pub fn site() -> Self {
        Self {
            service: None,
            role: Role::Site,
        }
    }

    pub fn database(service: &ServiceId) -> Self {
        Self {
            service: Some(service.clone()),
            role: Role::Database,
        }
    }

    pub fn application(service: &ServiceId) -> Self {
        Self {
            service: Some(service.clone()),
            role: Role::Application,
        }
    }

    /// Name used for resources owned by this deployable (e.g. `orders-db`).
    pub fn resource_name(&self) -> String {
        match &self.service {
            Some(service) => format!("{}-{}", service, self.role),
            None => self.role.to_string(),
        }
    }
}

impl std::fmt::Display for DeployableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.service {
            Some(service) => write!(f, "{}/{}", service, self.role),
            None => write!(f, "{}", self.role),
        }
    }
}

// Fixed namespace so plan ids are stable across runs and machines.
const PLAN_NAMESPACE: Uuid = Uuid::from_u128(0x6a1c_2f0e_93d4_4b7a_8e15_5c0d_f2a7_3b91);

/// Stable identifier of a stage plan.
/// Name-based (UUIDv5) so the same deployable always gets the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct PlanId(Uuid);

impl PlanId {
    pub fn for_deployable(deployable: &DeployableId) -> Self {
        Self(Uuid::new_v5(&PLAN_NAMESPACE, deployable.to_string().as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}
