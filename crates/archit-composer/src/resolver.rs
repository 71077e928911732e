//! Deployable resolution.
//!
//! Maps one deployable's configuration onto its deploy spec: sizing, network
//! placement, service discovery and the handle its deploy stage targets.
//! Resolution only reads the shared infrastructure; it never creates any.

use archit_core::config::{
    ApplicationConfig, ArchitecturePipelineConfig, DatabaseConfig, PipelineConfig, SiteConfig,
};
use archit_core::deploy::{
    CDN_REGION, ClusterRef, ComputeSizing, DeploySpec, DeployTarget, DeployableKind,
    DiscoveryBinding, NetworkPlacement, NetworkRef,
};
use archit_core::{DeployableId, ServiceId};
use serde::Serialize;
use thiserror::Error;

// Sizing of a managed container service; the document carries none.
const MANAGED_CONTAINER_CPU: u32 = 256;
const MANAGED_CONTAINER_MEMORY_MIB: u32 = 512;

/// Shared infrastructure a deployable may resolve against.
#[derive(Debug, Clone, Copy)]
pub struct ResolveEnv<'a> {
    pub network: &'a NetworkRef,
    pub cluster: Option<&'a ClusterRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{kind} requires the shared {dependency}, which is not available")]
    MissingDependency {
        kind: DeployableKind,
        dependency: &'static str,
    },
}

/// Resolution state of a single deployable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionState::Resolved | ResolutionState::Failed)
    }
}

impl std::fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionState::Unresolved => write!(f, "unresolved"),
            ResolutionState::Resolving => write!(f, "resolving"),
            ResolutionState::Resolved => write!(f, "resolved"),
            ResolutionState::Failed => write!(f, "failed"),
        }
    }
}

/// Configuration of one deployable, borrowed from the document.
#[derive(Debug, Clone, Copy)]
pub enum DeployableConfig<'a> {
    Architecture(&'a ArchitecturePipelineConfig),
    Site(&'a SiteConfig),
    Database(&'a ServiceId, &'a DatabaseConfig),
    Application(&'a ServiceId, &'a ApplicationConfig),
}

impl DeployableConfig<'_> {
    pub fn id(&self) -> DeployableId {
        match self {
            DeployableConfig::Architecture(_) => DeployableId::architecture(),
            DeployableConfig::Site(_) => DeployableId::site(),
            DeployableConfig::Database(service, _) => DeployableId::database(service),
            DeployableConfig::Application(service, _) => DeployableId::application(service),
        }
    }

    pub fn kind(&self) -> DeployableKind {
        match self {
            DeployableConfig::Architecture(_) => DeployableKind::ArchitecturePipeline,
            DeployableConfig::Site(_) => DeployableKind::StaticSite,
            DeployableConfig::Database(_, db) => db.kind(),
            DeployableConfig::Application(_, app) => app.kind(),
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        match self {
            DeployableConfig::Architecture(architecture) => &architecture.pipeline,
            DeployableConfig::Site(site) => &site.pipeline,
            DeployableConfig::Database(_, db) => db.pipeline(),
            DeployableConfig::Application(_, app) => app.pipeline(),
        }
    }
}

/// Resolve a deployable against the shared infrastructure.
pub fn resolve(config: DeployableConfig<'_>, env: &ResolveEnv<'_>) -> Result<DeploySpec, ResolveError> {
    let deployable = config.id();
    let kind = config.kind();
    let name = deployable.resource_name();

    let spec = match config {
        // Runs in the provider's build service; nothing to place.
        DeployableConfig::Architecture(architecture) => DeploySpec {
            kind,
            sizing: ComputeSizing::Managed,
            placement: NetworkPlacement::default(),
            discovery: None,
            target: DeployTarget::Architecture {
                name: architecture.id.clone(),
            },
            deployable,
        },
        DeployableConfig::Site(_) => DeploySpec {
            kind,
            sizing: ComputeSizing::Static,
            placement: NetworkPlacement {
                region: Some(CDN_REGION.to_string()),
                ..Default::default()
            },
            discovery: None,
            target: DeployTarget::Distribution {
                name: format!("{}-distribution", name),
                origin_bucket: format!("{}-origin", name),
            },
            deployable,
        },
        DeployableConfig::Database(_, DatabaseConfig::ManagedServerless { .. }) => DeploySpec {
            kind,
            sizing: ComputeSizing::Managed,
            placement: in_network(env.network, None),
            discovery: Some(discovery(env.network, &name)),
            target: DeployTarget::ManagedDatabase { name: name.clone() },
            deployable,
        },
        DeployableConfig::Database(_, DatabaseConfig::CustomContainer { cpu, mem, .. }) => {
            let cluster = require_cluster(kind, env)?;
            DeploySpec {
                kind,
                sizing: ComputeSizing::Container {
                    cpu: *cpu,
                    memory_mib: *mem,
                },
                placement: in_network(env.network, Some(cluster)),
                discovery: Some(discovery(env.network, &name)),
                target: DeployTarget::TaskDefinition {
                    family: name.clone(),
                },
                deployable,
            }
        }
        DeployableConfig::Application(_, ApplicationConfig::ServerlessContainer { memory_mb, .. }) => {
            DeploySpec {
                kind,
                sizing: ComputeSizing::Function {
                    memory_mb: *memory_mb,
                },
                placement: in_network(env.network, None),
                discovery: None,
                target: DeployTarget::Function { name: name.clone() },
                deployable,
            }
        }
        DeployableConfig::Application(_, ApplicationConfig::ManagedContainer { .. }) => {
            let cluster = require_cluster(kind, env)?;
            DeploySpec {
                kind,
                sizing: ComputeSizing::Container {
                    cpu: MANAGED_CONTAINER_CPU,
                    memory_mib: MANAGED_CONTAINER_MEMORY_MIB,
                },
                placement: in_network(env.network, Some(cluster)),
                discovery: Some(discovery(env.network, &name)),
                target: DeployTarget::TaskDefinition {
                    family: name.clone(),
                },
                deployable,
            }
        }
    };

    Ok(spec)
}

fn require_cluster<'a>(kind: DeployableKind, env: &ResolveEnv<'a>) -> Result<&'a ClusterRef, ResolveError> {
    env.cluster.ok_or(ResolveError::MissingDependency {
        kind,
        dependency: "cluster",
    })
}

fn in_network(network: &NetworkRef, cluster: Option<&ClusterRef>) -> NetworkPlacement {
    NetworkPlacement {
        vpc: Some(network.vpc.clone()),
        cluster: cluster.map(|c| c.name.clone()),
        region: None,
    }
}

fn discovery(network: &NetworkRef, name: &str) -> DiscoveryBinding {
    DiscoveryBinding {
        namespace: network.namespace.clone(),
        service_name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archit_core::config::RepositoryConfig;

    fn pipeline() -> PipelineConfig {
        PipelineConfig::from_repo(RepositoryConfig::Hosted {
            name: "repo".to_string(),
            create_if_missing: false,
        })
    }

    fn network() -> NetworkRef {
        NetworkRef {
            vpc: "svc-vpc".to_string(),
            namespace: "svc".to_string(),
            availability_zones: 2,
        }
    }

    fn cluster() -> ClusterRef {
        ClusterRef {
            name: "svc-cluster".to_string(),
            vpc: "svc-vpc".to_string(),
        }
    }

    #[test]
    fn test_custom_container_database() {
        let (network, cluster) = (network(), cluster());
        let env = ResolveEnv {
            network: &network,
            cluster: Some(&cluster),
        };
        let id = ServiceId::new("orders");
        let db = DatabaseConfig::CustomContainer {
            cpu: 512,
            mem: 2048,
            pipeline: pipeline(),
        };

        let spec = resolve(DeployableConfig::Database(&id, &db), &env).unwrap();
        assert_eq!(spec.deployable, DeployableId::database(&id));
        assert_eq!(
            spec.sizing,
            ComputeSizing::Container {
                cpu: 512,
                memory_mib: 2048
            }
        );
        assert_eq!(spec.placement.cluster.as_deref(), Some("svc-cluster"));
        assert_eq!(spec.discovery.unwrap().hostname(), "orders-db.svc");
        assert_eq!(
            spec.target,
            DeployTarget::TaskDefinition {
                family: "orders-db".to_string()
            }
        );
    }

    #[test]
    fn test_cluster_backed_kinds_without_cluster() {
        let network = network();
        let env = ResolveEnv {
            network: &network,
            cluster: None,
        };
        let id = ServiceId::new("orders");
        let app = ApplicationConfig::ManagedContainer {
            pipeline: pipeline(),
        };

        assert_eq!(
            resolve(DeployableConfig::Application(&id, &app), &env),
            Err(ResolveError::MissingDependency {
                kind: DeployableKind::ManagedContainerApp,
                dependency: "cluster",
            })
        );
    }

    #[test]
    fn test_serverless_kinds_ignore_cluster() {
        let network = network();
        let env = ResolveEnv {
            network: &network,
            cluster: None,
        };
        let id = ServiceId::new("orders");
        let db = DatabaseConfig::ManagedServerless {
            pipeline: pipeline(),
        };
        let app = ApplicationConfig::ServerlessContainer {
            memory_mb: 1024,
            pipeline: pipeline(),
        };

        let db_spec = resolve(DeployableConfig::Database(&id, &db), &env).unwrap();
        assert_eq!(db_spec.sizing, ComputeSizing::Managed);
        assert!(db_spec.placement.cluster.is_none());

        let app_spec = resolve(DeployableConfig::Application(&id, &app), &env).unwrap();
        assert_eq!(app_spec.sizing, ComputeSizing::Function { memory_mb: 1024 });
        assert!(app_spec.discovery.is_none());
        assert_eq!(app_spec.placement.vpc.as_deref(), Some("svc-vpc"));
    }

    #[test]
    fn test_site_pinned_to_cdn_region() {
        let network = network();
        let env = ResolveEnv {
            network: &network,
            cluster: None,
        };
        let site = SiteConfig {
            pipeline: pipeline(),
        };

        let spec = resolve(DeployableConfig::Site(&site), &env).unwrap();
        assert_eq!(spec.kind, DeployableKind::StaticSite);
        assert_eq!(spec.placement.region.as_deref(), Some("us-east-1"));
        assert!(spec.placement.vpc.is_none());
        assert!(matches!(spec.target, DeployTarget::Distribution { .. }));
    }

    #[test]
    fn test_architecture_pipeline_targets_whole_architecture() {
        let network = network();
        let env = ResolveEnv {
            network: &network,
            cluster: None,
        };
        let architecture = ArchitecturePipelineConfig {
            id: "shop".to_string(),
            pipeline: pipeline(),
        };

        let spec = resolve(DeployableConfig::Architecture(&architecture), &env).unwrap();
        assert_eq!(spec.deployable, DeployableId::architecture());
        assert_eq!(spec.kind, DeployableKind::ArchitecturePipeline);
        assert_eq!(spec.placement, NetworkPlacement::default());
        assert_eq!(spec.target.to_string(), "architecture:shop");
    }

    #[test]
    fn test_resolution_state_terminal() {
        assert!(!ResolutionState::Unresolved.is_terminal());
        assert!(!ResolutionState::Resolving.is_terminal());
        assert!(ResolutionState::Resolved.is_terminal());
        assert!(ResolutionState::Failed.is_terminal());
    }
}
