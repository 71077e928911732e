//! Deploy specs and shared infrastructure references.
//!
//! A `DeploySpec` is what the resolver hands to the provisioning collaborator
//! for one deployable: how big it is, where it sits in the network, how it is
//! discovered, and which handle its pipeline's deploy stage targets.

use serde::{Deserialize, Serialize};

use crate::DeployableId;

/// Region the CDN and its supporting resources must live in.
pub const CDN_REGION: &str = "us-east-1";

/// Concrete backing stack of a deployable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployableKind {
    /// Pipeline that renders the architecture document and deploys the
    /// assembled result.
    ArchitecturePipeline,
    /// Files in an origin bucket behind a CDN distribution.
    StaticSite,
    /// Provider-managed serverless database.
    ManagedServerlessDatabase,
    /// Database container task on the shared cluster.
    CustomContainerDatabase,
    /// Container image run as a serverless function.
    ServerlessContainerApp,
    /// Application container service on the shared cluster.
    ManagedContainerApp,
}

impl DeployableKind {
    /// Whether resolution needs the shared compute cluster.
    pub fn requires_cluster(&self) -> bool {
        matches!(
            self,
            DeployableKind::CustomContainerDatabase | DeployableKind::ManagedContainerApp
        )
    }

    /// Whether the build stage produces a container image.
    pub fn builds_container_image(&self) -> bool {
        matches!(
            self,
            DeployableKind::CustomContainerDatabase
                | DeployableKind::ServerlessContainerApp
                | DeployableKind::ManagedContainerApp
        )
    }

    /// Whether the pipeline ends by deploying the build output somewhere.
    pub fn has_deploy_stage(&self) -> bool {
        !matches!(self, DeployableKind::ManagedServerlessDatabase)
    }

    /// Whether the pipeline may carry a test stage.
    pub fn runs_tests(&self) -> bool {
        !matches!(self, DeployableKind::ArchitecturePipeline)
    }

    /// Whether an enabled `deploy` section may replace the standard deploy
    /// with a spec file from the repository.
    pub fn accepts_deploy_spec(&self) -> bool {
        self.has_deploy_stage() && !matches!(self, DeployableKind::ArchitecturePipeline)
    }
}

impl std::fmt::Display for DeployableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployableKind::ArchitecturePipeline => write!(f, "architecture_pipeline"),
            DeployableKind::StaticSite => write!(f, "static_site"),
            DeployableKind::ManagedServerlessDatabase => write!(f, "managed_serverless_database"),
            DeployableKind::CustomContainerDatabase => write!(f, "custom_container_database"),
            DeployableKind::ServerlessContainerApp => write!(f, "serverless_container_app"),
            DeployableKind::ManagedContainerApp => write!(f, "managed_container_app"),
        }
    }
}

/// Virtual network shared by all services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub vpc: String,
    pub namespace: String,
    pub availability_zones: u8,
}

/// Shared container cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub name: String,
    pub vpc: String,
}

/// Bucket holding build caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRef {
    pub bucket: String,
    pub region: Option<String>,
}

/// Infrastructure instantiated once per assembly and read by every service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedInfra {
    pub network: NetworkRef,
    pub cluster: Option<ClusterRef>,
    pub build_cache: CacheRef,
}

/// Compute sizing of a deployable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputeSizing {
    Container { cpu: u32, memory_mib: u32 },
    Function { memory_mb: u32 },
    /// Capacity is managed by the provider.
    Managed,
    /// No compute (static files).
    Static,
}

/// Where a deployable sits in the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlacement {
    pub vpc: Option<String>,
    pub cluster: Option<String>,
    /// Pinned region, when the deployable cannot live in the default one.
    pub region: Option<String>,
}

/// Registration of a deployable in the private DNS namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryBinding {
    pub namespace: String,
    pub service_name: String,
}

impl DiscoveryBinding {
    /// Fully qualified name other services use to reach this one.
    pub fn hostname(&self) -> String {
        format!("{}.{}", self.service_name, self.namespace)
    }
}

/// Handle a pipeline's deploy or invalidate stage acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployTarget {
    TaskDefinition { family: String },
    Function { name: String },
    Distribution { name: String, origin_bucket: String },
    ManagedDatabase { name: String },
    /// Every deployable of an assembled architecture, under one name.
    Architecture { name: String },
}

impl std::fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployTarget::TaskDefinition { family } => write!(f, "task-definition:{}", family),
            DeployTarget::Function { name } => write!(f, "function:{}", name),
            DeployTarget::Distribution { name, .. } => write!(f, "distribution:{}", name),
            DeployTarget::ManagedDatabase { name } => write!(f, "database:{}", name),
            DeployTarget::Architecture { name } => write!(f, "architecture:{}", name),
        }
    }
}

/// Provisioning shape of one deployable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySpec {
    pub deployable: DeployableId,
    pub kind: DeployableKind,
    pub sizing: ComputeSizing,
    pub placement: NetworkPlacement,
    pub discovery: Option<DiscoveryBinding>,
    pub target: DeployTarget,
}
