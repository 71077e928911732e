//! Stage plans.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::config::RepositoryConfig;
use crate::deploy::{CacheRef, DeployTarget};
use crate::{DeployableId, PlanId};

/// Kind of a pipeline stage. Declaration order is pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StageKind {
    Source,
    Build,
    Test,
    Approval,
    Deploy,
    Invalidate,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Source => write!(f, "Source"),
            StageKind::Build => write!(f, "Build"),
            StageKind::Test => write!(f, "Test"),
            StageKind::Approval => write!(f, "Approval"),
            StageKind::Deploy => write!(f, "Deploy"),
            StageKind::Invalidate => write!(f, "Invalidate"),
        }
    }
}

/// What kind of data an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Repository checkout.
    Checkout,
    /// Build output files.
    Files,
    /// Container image pushed to a registry.
    Image,
}

/// Named piece of data passed between stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactRef {
    pub name: String,
    pub kind: ArtifactKind,
}

impl ArtifactRef {
    pub const SOURCE_OUTPUT: &'static str = "source-output";
    pub const BUILD_OUTPUT: &'static str = "build-output";

    pub fn source() -> Self {
        Self {
            name: Self::SOURCE_OUTPUT.to_string(),
            kind: ArtifactKind::Checkout,
        }
    }

    pub fn build(kind: ArtifactKind) -> Self {
        Self {
            name: Self::BUILD_OUTPUT.to_string(),
            kind,
        }
    }
}

/// Build environment and commands of a build stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildProfile {
    /// Build environment image.
    pub image: String,
    /// Elevated execution mode (needed for container image builds).
    pub privileged: bool,
    /// Build spec read from the repository, when the build is repository-driven.
    pub spec_file: Option<String>,
    /// Inline commands, when the build is fully defined by the composer.
    pub commands: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Image registry the build pushes to.
    pub registry: Option<String>,
    pub cache: Option<CacheRef>,
}

/// What a stage does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageAction {
    /// Check out the repository.
    Source { repository: RepositoryConfig },
    Build(BuildProfile),
    /// Run the test spec against the checkout.
    Test {
        spec_file: String,
        cache: Option<CacheRef>,
    },
    /// Block until manually acknowledged.
    Approval,
    Deploy {
        target: DeployTarget,
        spec_file: Option<String>,
    },
    /// Invalidate a CDN distribution cache.
    Invalidate { target: DeployTarget },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub name: String,
    pub kind: StageKind,
    pub inputs: Vec<ArtifactRef>,
    pub outputs: Vec<ArtifactRef>,
    pub action: StageAction,
}

/// Ordered stages of one deployable's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    pub id: PlanId,
    pub deployable: DeployableId,
    pub stages: Vec<StageDescriptor>,
}

/// Broken artifact wiring in a stage plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    #[error("stage '{stage}' consumes '{artifact}' which no earlier stage produces")]
    Dangling { stage: String, artifact: String },

    #[error("artifact '{artifact}' is produced more than once (again by '{stage}')")]
    DuplicateProducer { stage: String, artifact: String },
}

impl StagePlan {
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageDescriptor> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    /// Check every input is produced by exactly one earlier stage.
    /// Since inputs may only refer backwards, a plan passing this check is acyclic.
    pub fn check_wiring(&self) -> Result<(), WiringError> {
        let mut produced: HashSet<&str> = HashSet::new();

        for stage in &self.stages {
            for input in &stage.inputs {
                if !produced.contains(input.name.as_str()) {
                    return Err(WiringError::Dangling {
                        stage: stage.name.clone(),
                        artifact: input.name.clone(),
                    });
                }
            }
            for output in &stage.outputs {
                if !produced.insert(output.name.as_str()) {
                    return Err(WiringError::DuplicateProducer {
                        stage: stage.name.clone(),
                        artifact: output.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(kind: StageKind, inputs: Vec<ArtifactRef>, outputs: Vec<ArtifactRef>) -> StageDescriptor {
        StageDescriptor {
            name: kind.to_string(),
            kind,
            inputs,
            outputs,
            action: StageAction::Approval,
        }
    }

    fn plan(stages: Vec<StageDescriptor>) -> StagePlan {
        let deployable = DeployableId::site();
        StagePlan {
            id: PlanId::for_deployable(&deployable),
            deployable,
            stages,
        }
    }

    #[test]
    fn test_stage_kind_order() {
        assert!(StageKind::Source < StageKind::Build);
        assert!(StageKind::Test < StageKind::Approval);
        assert!(StageKind::Deploy < StageKind::Invalidate);
    }

    #[test]
    fn test_wiring_ok() {
        let p = plan(vec![
            stage(StageKind::Source, vec![], vec![ArtifactRef::source()]),
            stage(
                StageKind::Build,
                vec![ArtifactRef::source()],
                vec![ArtifactRef::build(ArtifactKind::Files)],
            ),
            stage(StageKind::Deploy, vec![ArtifactRef::build(ArtifactKind::Files)], vec![]),
        ]);
        assert!(p.check_wiring().is_ok());
        assert_eq!(
            p.kinds(),
            vec![StageKind::Source, StageKind::Build, StageKind::Deploy]
        );
    }

    #[test]
    fn test_wiring_dangling_input() {
        let p = plan(vec![
            stage(StageKind::Source, vec![], vec![ArtifactRef::source()]),
            stage(StageKind::Deploy, vec![ArtifactRef::build(ArtifactKind::Image)], vec![]),
        ]);
        assert!(matches!(
            p.check_wiring(),
            Err(WiringError::Dangling { ref artifact, .. }) if artifact == "build-output"
        ));
    }

    #[test]
    fn test_wiring_duplicate_producer() {
        let p = plan(vec![
            stage(StageKind::Source, vec![], vec![ArtifactRef::source()]),
            stage(StageKind::Build, vec![], vec![ArtifactRef::source()]),
        ]);
        assert!(matches!(
            p.check_wiring(),
            Err(WiringError::DuplicateProducer { .. })
        ));
    }
}
