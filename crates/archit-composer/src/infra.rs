//! Shared infrastructure layout.

use archit_core::config::{ArchitectureConfig, NetworkConfig};
use archit_core::deploy::{CDN_REGION, CacheRef, ClusterRef, NetworkRef, SharedInfra};

/// Lay out the infrastructure shared by every service of `config`.
///
/// The cluster is only created when some service has a cluster-backed
/// database or application.
pub fn shared_infra(config: &ArchitectureConfig) -> SharedInfra {
    let network = network_ref(&config.services.network);
    let needs_cluster = config
        .services
        .services
        .iter()
        .any(|s| s.db.kind().requires_cluster() || s.app.kind().requires_cluster());

    let cluster = needs_cluster.then(|| ClusterRef {
        name: format!("{}-cluster", network.namespace),
        vpc: network.vpc.clone(),
    });

    SharedInfra {
        build_cache: CacheRef {
            bucket: format!("{}-build-cache", network.namespace),
            region: None,
        },
        network,
        cluster,
    }
}

/// Build cache used by the site pipeline; lives next to the CDN.
pub fn site_cache(infra: &SharedInfra) -> CacheRef {
    CacheRef {
        bucket: format!("{}-site-build-cache", infra.network.namespace),
        region: Some(CDN_REGION.to_string()),
    }
}

fn network_ref(network: &NetworkConfig) -> NetworkRef {
    NetworkRef {
        vpc: format!("{}-vpc", network.namespace),
        namespace: network.namespace.clone(),
        availability_zones: network.availability_zone_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archit_core::ServiceId;
    use archit_core::config::{
        ApplicationConfig, DatabaseConfig, PipelineConfig, RepositoryConfig, ServiceConfig,
        ServicesConfig,
    };

    fn pipeline() -> PipelineConfig {
        PipelineConfig::from_repo(RepositoryConfig::Hosted {
            name: "repo".to_string(),
            create_if_missing: false,
        })
    }

    fn config(app: ApplicationConfig) -> ArchitectureConfig {
        ArchitectureConfig {
            pipeline: None,
            site: None,
            services: ServicesConfig {
                network: NetworkConfig {
                    namespace: "svc".to_string(),
                    availability_zone_count: 2,
                },
                services: vec![ServiceConfig {
                    id: ServiceId::new("orders"),
                    db: DatabaseConfig::ManagedServerless {
                        pipeline: pipeline(),
                    },
                    app,
                }],
            },
        }
    }

    #[test]
    fn test_no_cluster_without_cluster_backed_service() {
        let infra = shared_infra(&config(ApplicationConfig::ServerlessContainer {
            memory_mb: 512,
            pipeline: pipeline(),
        }));
        assert!(infra.cluster.is_none());
        assert_eq!(infra.network.vpc, "svc-vpc");
        assert_eq!(infra.network.availability_zones, 2);
    }

    #[test]
    fn test_cluster_for_managed_container_app() {
        let infra = shared_infra(&config(ApplicationConfig::ManagedContainer {
            pipeline: pipeline(),
        }));
        let cluster = infra.cluster.unwrap();
        assert_eq!(cluster.name, "svc-cluster");
        assert_eq!(cluster.vpc, "svc-vpc");
    }

    #[test]
    fn test_site_cache_region() {
        let infra = shared_infra(&config(ApplicationConfig::ManagedContainer {
            pipeline: pipeline(),
        }));
        let cache = site_cache(&infra);
        assert_eq!(cache.region.as_deref(), Some("us-east-1"));
        assert_ne!(cache.bucket, infra.build_cache.bucket);
    }
}
