//! Pipeline stage planner - turns a pipeline configuration into ordered stages.
//!
//! Every plan starts with `Source` and `Build`, then adds the optional `Test`
//! and `Approval` stages, and ends with the deployable's deploy contract.
//! Test stages consume the checkout, not the build output. The architecture
//! pipeline's build stage is named `Synth`: it renders the plan its deploy
//! stage provisions.

use archit_core::config::{PipelineConfig, PipelineSection};
use archit_core::deploy::{CacheRef, DeploySpec, DeployTarget, DeployableKind};
use archit_core::stage::{
    ArtifactKind, ArtifactRef, BuildProfile, StageAction, StageDescriptor, StageKind, StagePlan,
    WiringError,
};
use archit_core::PlanId;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Build environment image for every build and test stage.
pub const BUILD_IMAGE: &str = "aws/codebuild/standard:5.0";

/// Build spec run from the repository by file-based builds.
pub const DEFAULT_BUILD_SPEC: &str = "buildspec.yml";

/// Name of the build stage of an architecture pipeline.
pub const SYNTH_STAGE: &str = "Synth";

/// Architecture document the architecture pipeline reads from its checkout.
pub const ARCHITECTURE_DOCUMENT: &str = "archit.yaml";

/// Rendered plan handed from the synth stage to the deploy stage.
pub const SYNTH_OUTPUT: &str = "archit-plan.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{section} stage is enabled but has no spec file")]
    MissingSpecFile { section: PipelineSection },

    #[error("Build stage of a {kind} builds a container image and must run privileged")]
    PrivilegedRequired { kind: DeployableKind },

    #[error("{section} stage is not supported for a {kind}")]
    UnsupportedStage {
        section: PipelineSection,
        kind: DeployableKind,
    },

    #[error("invalid artifact wiring: {0}")]
    Wiring(#[from] WiringError),
}

impl PlanError {
    /// Pipeline section the error was raised for.
    pub fn section(&self) -> Option<PipelineSection> {
        match self {
            PlanError::MissingSpecFile { section } | PlanError::UnsupportedStage { section, .. } => {
                Some(*section)
            }
            PlanError::PrivilegedRequired { .. } => Some(PipelineSection::Build),
            PlanError::Wiring(_) => None,
        }
    }
}

/// Plans the stages of one deployable's pipeline.
pub struct StagePlanner {
    /// Build cache shared by the build and test stages of this planner's plans.
    cache: CacheRef,
}

impl StagePlanner {
    pub fn new(cache: CacheRef) -> Self {
        Self { cache }
    }

    pub fn plan(&self, pipeline: &PipelineConfig, spec: &DeploySpec) -> Result<StagePlan, PlanError> {
        let kind = spec.kind;
        if let Some(section) = unsupported_section(pipeline, kind) {
            return Err(PlanError::UnsupportedStage { section, kind });
        }

        let mut stages = vec![
            StageDescriptor {
                name: StageKind::Source.to_string(),
                kind: StageKind::Source,
                inputs: vec![],
                outputs: vec![ArtifactRef::source()],
                action: StageAction::Source {
                    repository: pipeline.repo.clone(),
                },
            },
            self.build_stage(pipeline, spec)?,
        ];

        if pipeline.test_enabled() {
            let spec_file = required_spec_file(pipeline, PipelineSection::Test)?;
            stages.push(StageDescriptor {
                name: StageKind::Test.to_string(),
                kind: StageKind::Test,
                inputs: vec![ArtifactRef::source()],
                outputs: vec![],
                action: StageAction::Test {
                    spec_file,
                    cache: Some(self.cache.clone()),
                },
            });
        }

        if pipeline.approval_enabled() {
            stages.push(StageDescriptor {
                name: StageKind::Approval.to_string(),
                kind: StageKind::Approval,
                inputs: vec![],
                outputs: vec![],
                action: StageAction::Approval,
            });
        }

        if kind.has_deploy_stage() {
            let spec_file = if pipeline.deploy_enabled() {
                Some(required_spec_file(pipeline, PipelineSection::Deploy)?)
            } else {
                None
            };
            stages.push(StageDescriptor {
                name: StageKind::Deploy.to_string(),
                kind: StageKind::Deploy,
                inputs: vec![ArtifactRef::build(build_artifact(kind))],
                outputs: vec![],
                action: StageAction::Deploy {
                    target: spec.target.clone(),
                    spec_file,
                },
            });
        }

        if kind == DeployableKind::StaticSite {
            stages.push(StageDescriptor {
                name: StageKind::Invalidate.to_string(),
                kind: StageKind::Invalidate,
                inputs: vec![],
                outputs: vec![],
                action: StageAction::Invalidate {
                    target: spec.target.clone(),
                },
            });
        }

        let plan = StagePlan {
            id: PlanId::for_deployable(&spec.deployable),
            deployable: spec.deployable.clone(),
            stages,
        };
        plan.check_wiring()?;

        debug!(deployable = %plan.deployable, stages = ?plan.kinds(), "Planned stages");
        Ok(plan)
    }

    fn build_stage(&self, pipeline: &PipelineConfig, spec: &DeploySpec) -> Result<StageDescriptor, PlanError> {
        let kind = spec.kind;
        if kind == DeployableKind::ArchitecturePipeline {
            return Ok(StageDescriptor {
                name: SYNTH_STAGE.to_string(),
                kind: StageKind::Build,
                inputs: vec![ArtifactRef::source()],
                outputs: vec![ArtifactRef::build(ArtifactKind::Files)],
                action: StageAction::Build(self.synth_profile()),
            });
        }

        let profile = if kind.builds_container_image() {
            // An omitted build section takes the standard (privileged) container profile.
            if pipeline.build.is_some_and(|b| !b.privileged) {
                return Err(PlanError::PrivilegedRequired { kind });
            }
            self.container_profile(spec)
        } else {
            BuildProfile {
                image: BUILD_IMAGE.to_string(),
                privileged: pipeline.build.is_some_and(|b| b.privileged),
                spec_file: Some(DEFAULT_BUILD_SPEC.to_string()),
                commands: vec![],
                env: BTreeMap::new(),
                registry: None,
                cache: Some(self.cache.clone()),
            }
        };

        Ok(StageDescriptor {
            name: StageKind::Build.to_string(),
            kind: StageKind::Build,
            inputs: vec![ArtifactRef::source()],
            outputs: vec![ArtifactRef::build(build_artifact(kind))],
            action: StageAction::Build(profile),
        })
    }

    /// Validate the checked-out architecture document and render its plan,
    /// which the deploy stage then provisions.
    fn synth_profile(&self) -> BuildProfile {
        BuildProfile {
            image: BUILD_IMAGE.to_string(),
            privileged: false,
            spec_file: None,
            commands: vec![
                "archit validate ${ARCHIT_DOCUMENT}".to_string(),
                format!("archit plan ${{ARCHIT_DOCUMENT}} --format json > {}", SYNTH_OUTPUT),
            ],
            env: BTreeMap::from([(
                "ARCHIT_DOCUMENT".to_string(),
                ARCHITECTURE_DOCUMENT.to_string(),
            )]),
            registry: None,
            cache: Some(self.cache.clone()),
        }
    }

    /// Build and push an image to the deployable's own registry.
    /// `REGISTRY_URI` is supplied by the provisioner once the registry exists.
    fn container_profile(&self, spec: &DeploySpec) -> BuildProfile {
        let image = spec.deployable.resource_name();
        let mut env = BTreeMap::from([("IMAGE_NAME".to_string(), image.clone())]);
        let mut commands = vec![
            "aws ecr get-login-password | docker login --username AWS --password-stdin ${REGISTRY_URI}"
                .to_string(),
            "docker build -t ${IMAGE_NAME}:latest .".to_string(),
            "docker tag ${IMAGE_NAME}:latest ${REGISTRY_URI}:latest".to_string(),
            "docker push ${REGISTRY_URI}:latest".to_string(),
        ];

        if spec.kind == DeployableKind::CustomContainerDatabase {
            if let DeployTarget::TaskDefinition { family } = &spec.target {
                env.insert("TASK_FAMILY".to_string(), family.clone());
                commands.push("aws ecs register-task-definition --family ${TASK_FAMILY}".to_string());
            }
        }

        BuildProfile {
            image: BUILD_IMAGE.to_string(),
            privileged: true,
            spec_file: None,
            commands,
            env,
            registry: Some(image),
            cache: Some(self.cache.clone()),
        }
    }
}

/// First enabled section the deployable kind has no stage for.
fn unsupported_section(pipeline: &PipelineConfig, kind: DeployableKind) -> Option<PipelineSection> {
    if pipeline.staging_enabled() {
        Some(PipelineSection::Staging)
    } else if pipeline.test_enabled() && !kind.runs_tests() {
        Some(PipelineSection::Test)
    } else if pipeline.deploy_enabled() && !kind.accepts_deploy_spec() {
        Some(PipelineSection::Deploy)
    } else {
        None
    }
}

fn build_artifact(kind: DeployableKind) -> ArtifactKind {
    if kind.builds_container_image() {
        ArtifactKind::Image
    } else {
        ArtifactKind::Files
    }
}

fn required_spec_file(pipeline: &PipelineConfig, section: PipelineSection) -> Result<String, PlanError> {
    pipeline
        .stage_option(section)
        .and_then(|o| o.spec_file.clone())
        .ok_or(PlanError::MissingSpecFile { section })
}
