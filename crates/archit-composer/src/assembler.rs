//! Architecture assembler - composes shared infrastructure and every
//! deployable's deploy spec and stage plan.
//!
//! Assembly is a single synchronous pass: decode once, reject duplicate
//! service ids, lay out shared infrastructure, then resolve and plan the
//! architecture pipeline, the site and each service (database, then
//! application) in document order. The first failure aborts the pass.

use archit_config::{DecodeError, Tree, decode_architecture};
use archit_core::ServiceId;
use archit_core::config::ArchitectureConfig;
use archit_core::deploy::{DeploySpec, SharedInfra};
use archit_core::stage::StagePlan;
use archit_core::{DeployableId, PlanId};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::infra::{shared_infra, site_cache};
use crate::planner::{PlanError, StagePlanner};
use crate::resolver::{DeployableConfig, ResolutionState, ResolveEnv, ResolveError, resolve};

/// Why a single deployable could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployableError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("duplicate service id '{id}'")]
    DuplicateService { id: ServiceId },

    #[error("service '{id}': {source}")]
    Service {
        id: ServiceId,
        #[source]
        source: DeployableError,
    },

    #[error("architecture pipeline: {source}")]
    Architecture {
        #[source]
        source: DeployableError,
    },

    #[error("site: {source}")]
    Site {
        #[source]
        source: DeployableError,
    },
}

/// Event emitted during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyEvent {
    InfrastructureReady { cluster: bool },
    ResolutionChanged {
        deployable: DeployableId,
        state: ResolutionState,
    },
    PlanReady {
        deployable: DeployableId,
        plan: PlanId,
        stages: usize,
    },
}

/// Receives assembly events. Observers cannot influence the result.
pub trait AssemblyObserver {
    fn on_event(&mut self, event: &AssemblyEvent);
}

impl AssemblyObserver for () {
    fn on_event(&mut self, _event: &AssemblyEvent) {}
}

impl AssemblyObserver for Vec<AssemblyEvent> {
    fn on_event(&mut self, event: &AssemblyEvent) {
        self.push(event.clone());
    }
}

/// Deploy spec and stage plan of one deployable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployablePlan {
    pub spec: DeploySpec,
    pub plan: StagePlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePlan {
    pub id: ServiceId,
    pub db: DeployablePlan,
    pub app: DeployablePlan,
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchitecturePlan {
    pub infra: SharedInfra,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<DeployablePlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<DeployablePlan>,
    pub services: Vec<ServicePlan>,
}

impl ArchitecturePlan {
    /// Every deployable in plan order: the architecture pipeline, the site,
    /// then each service's database and application.
    pub fn deployables(&self) -> impl Iterator<Item = &DeployablePlan> {
        self.architecture
            .iter()
            .chain(self.site.iter())
            .chain(self.services.iter().flat_map(|s| [&s.db, &s.app]))
    }

    pub fn service(&self, id: &str) -> Option<&ServicePlan> {
        self.services.iter().find(|s| s.id.as_str() == id)
    }
}

/// Assemble a document tree.
pub fn assemble(document: &Tree) -> Result<ArchitecturePlan, AssembleError> {
    assemble_with(document, &mut ())
}

/// Assemble a document tree, reporting progress to `observer`.
pub fn assemble_with(
    document: &Tree,
    observer: &mut dyn AssemblyObserver,
) -> Result<ArchitecturePlan, AssembleError> {
    let config = decode_architecture(document)?;
    assemble_config(&config, observer)
}

/// Assemble an already decoded document.
pub fn assemble_config(
    config: &ArchitectureConfig,
    observer: &mut dyn AssemblyObserver,
) -> Result<ArchitecturePlan, AssembleError> {
    let services = &config.services.services;
    info!(
        services = services.len(),
        site = config.site.is_some(),
        pipeline = config.pipeline.is_some(),
        "Assembling architecture"
    );

    let mut seen = HashSet::new();
    for service in services {
        if !seen.insert(&service.id) {
            error!(service = %service.id, "Duplicate service id");
            return Err(AssembleError::DuplicateService {
                id: service.id.clone(),
            });
        }
    }

    let infra = shared_infra(config);
    observer.on_event(&AssemblyEvent::InfrastructureReady {
        cluster: infra.cluster.is_some(),
    });
    debug!(
        vpc = %infra.network.vpc,
        cluster = ?infra.cluster.as_ref().map(|c| &c.name),
        "Shared infrastructure ready"
    );

    let env = ResolveEnv {
        network: &infra.network,
        cluster: infra.cluster.as_ref(),
    };

    let planner = StagePlanner::new(infra.build_cache.clone());

    let architecture = match &config.pipeline {
        Some(pipeline) => {
            let plan = assemble_deployable(
                DeployableConfig::Architecture(pipeline),
                &env,
                &planner,
                observer,
            )
            .map_err(|source| {
                error!(architecture = %pipeline.id, error = %source, "Architecture pipeline assembly failed");
                AssembleError::Architecture { source }
            })?;
            Some(plan)
        }
        None => None,
    };

    let site = match &config.site {
        Some(site) => {
            let planner = StagePlanner::new(site_cache(&infra));
            let plan = assemble_deployable(DeployableConfig::Site(site), &env, &planner, observer)
                .map_err(|source| {
                    error!(error = %source, "Site assembly failed");
                    AssembleError::Site { source }
                })?;
            Some(plan)
        }
        None => None,
    };

    let mut service_plans = Vec::with_capacity(services.len());
    for service in services {
        let fail = |source: DeployableError| {
            error!(service = %service.id, error = %source, "Service assembly failed");
            AssembleError::Service {
                id: service.id.clone(),
                source,
            }
        };

        let db = assemble_deployable(
            DeployableConfig::Database(&service.id, &service.db),
            &env,
            &planner,
            observer,
        )
        .map_err(fail)?;
        let app = assemble_deployable(
            DeployableConfig::Application(&service.id, &service.app),
            &env,
            &planner,
            observer,
        )
        .map_err(fail)?;

        info!(service = %service.id, db = %db.spec.kind, app = %app.spec.kind, "Service assembled");
        service_plans.push(ServicePlan {
            id: service.id.clone(),
            db,
            app,
        });
    }

    Ok(ArchitecturePlan {
        infra,
        architecture,
        site,
        services: service_plans,
    })
}

fn assemble_deployable(
    config: DeployableConfig<'_>,
    env: &ResolveEnv<'_>,
    planner: &StagePlanner,
    observer: &mut dyn AssemblyObserver,
) -> Result<DeployablePlan, DeployableError> {
    let deployable = config.id();
    let mut transition = |state: ResolutionState| {
        debug!(deployable = %deployable, %state, "Resolution state changed");
        observer.on_event(&AssemblyEvent::ResolutionChanged {
            deployable: deployable.clone(),
            state,
        });
    };

    transition(ResolutionState::Resolving);
    let spec = match resolve(config, env) {
        Ok(spec) => {
            transition(ResolutionState::Resolved);
            spec
        }
        Err(e) => {
            transition(ResolutionState::Failed);
            return Err(e.into());
        }
    };

    let plan = planner.plan(config.pipeline(), &spec)?;
    observer.on_event(&AssemblyEvent::PlanReady {
        deployable,
        plan: plan.id,
        stages: plan.stages.len(),
    });

    Ok(DeployablePlan { spec, plan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hosted(name: &str) -> serde_json::Value {
        json!({"kind": "Hosted", "name": name})
    }

    fn document(services: serde_json::Value) -> Tree {
        json!({
            "network": {"namespace": "svc", "availabilityZoneCount": 2},
            "services": services
        })
    }

    fn serverless_service(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "db": {"kind": "ManagedServerless", "pipeline": {"repo": hosted("db")}},
            "app": {"kind": "ServerlessContainer", "memoryMB": 512, "pipeline": {"repo": hosted("app")}}
        })
    }

    #[test]
    fn test_serverless_only_has_no_cluster() {
        let mut events = Vec::new();
        let plan = assemble_with(&document(json!([serverless_service("orders")])), &mut events)
            .unwrap();

        assert!(plan.infra.cluster.is_none());
        assert_eq!(events[0], AssemblyEvent::InfrastructureReady { cluster: false });
        assert_eq!(plan.deployables().count(), 2);
    }

    #[test]
    fn test_resolution_events_in_order() {
        let mut events = Vec::new();
        assemble_with(&document(json!([serverless_service("orders")])), &mut events).unwrap();

        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AssemblyEvent::ResolutionChanged { deployable, state } => {
                    Some((deployable.to_string(), *state))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ("orders/db".to_string(), ResolutionState::Resolving),
                ("orders/db".to_string(), ResolutionState::Resolved),
                ("orders/app".to_string(), ResolutionState::Resolving),
                ("orders/app".to_string(), ResolutionState::Resolved),
            ]
        );
    }

    #[test]
    fn test_plan_error_names_service() {
        let mut service = serverless_service("billing");
        service["app"]["pipeline"]["deploy"] = json!({"enabled": true, "specFile": "d.yml"});
        service["db"]["pipeline"]["deploy"] = json!({"enabled": true, "specFile": "d.yml"});

        let err = assemble(&document(json!([serverless_service("orders"), service]))).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Service {
                ref id,
                source: DeployableError::Plan(PlanError::UnsupportedStage { .. })
            } if id.as_str() == "billing"
        ));
    }

    #[test]
    fn test_decode_errors_pass_through() {
        let err = assemble(&json!({"network": {"namespace": "svc", "availabilityZoneCount": 1}}))
            .unwrap_err();
        assert!(matches!(err, AssembleError::Decode(ref e) if e.field == "services"));
    }

    #[test]
    fn test_architecture_pipeline_comes_first() {
        let mut document = document(json!([serverless_service("orders")]));
        document["archi"] = json!({
            "id": "shop",
            "pipeline": {"repo": hosted("shop-infra"), "approval": {"enabled": true}}
        });

        let mut events = Vec::new();
        let plan = assemble_with(&document, &mut events).unwrap();

        let ids: Vec<String> = plan
            .deployables()
            .map(|d| d.spec.deployable.to_string())
            .collect();
        assert_eq!(ids, vec!["architecture", "orders/db", "orders/app"]);
        assert_eq!(
            events[1],
            AssemblyEvent::ResolutionChanged {
                deployable: DeployableId::architecture(),
                state: ResolutionState::Resolving,
            }
        );
    }

    #[test]
    fn test_architecture_pipeline_error() {
        let mut document = document(json!([serverless_service("orders")]));
        document["archi"] = json!({
            "id": "shop",
            "pipeline": {"repo": hosted("shop-infra"),
                         "test": {"enabled": true, "specFile": "buildspec-test.yml"}}
        });

        let err = assemble(&document).unwrap_err();
        assert!(matches!(
            err,
            AssembleError::Architecture {
                source: DeployableError::Plan(PlanError::UnsupportedStage { .. })
            }
        ));
    }
}
