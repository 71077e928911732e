//! Typed configuration records.
//!
//! These are the validated shapes the decoder in `archit-config` produces from
//! an untyped document. They serialise back to the same tree layout the
//! decoder reads (`kind` discriminator, camelCase field names).

use derive_more::Display;
use serde::Serialize;

use crate::ServiceId;
use crate::deploy::DeployableKind;

/// Name of a credential held by the credential collaborator.
/// Only the reference ever passes through the composer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Source repository of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum RepositoryConfig {
    /// Repository hosted by the platform itself.
    Hosted { name: String, create_if_missing: bool },
    /// Repository on an external provider, reached with a stored credential.
    External {
        name: String,
        owner: String,
        credential_ref: CredentialRef,
    },
}

impl RepositoryConfig {
    pub fn name(&self) -> &str {
        match self {
            RepositoryConfig::Hosted { name, .. } | RepositoryConfig::External { name, .. } => {
                name
            }
        }
    }

    pub fn credential_ref(&self) -> Option<&CredentialRef> {
        match self {
            RepositoryConfig::Hosted { .. } => None,
            RepositoryConfig::External { credential_ref, .. } => Some(credential_ref),
        }
    }
}

/// Build environment options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    pub privileged: bool,
}

/// Toggle for an optional pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOption {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_file: Option<String>,
}

impl StageOption {
    pub fn enabled(spec_file: impl Into<String>) -> Self {
        Self {
            enabled: true,
            spec_file: Some(spec_file.into()),
        }
    }
}

/// Optional sections of a pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineSection {
    Build,
    Staging,
    Test,
    Approval,
    Deploy,
}

impl PipelineSection {
    /// Key of the section in the configuration document.
    pub fn key(&self) -> &'static str {
        match self {
            PipelineSection::Build => "build",
            PipelineSection::Staging => "staging",
            PipelineSection::Test => "test",
            PipelineSection::Approval => "approval",
            PipelineSection::Deploy => "deploy",
        }
    }

    /// Whether enabling the section requires a spec file.
    pub fn requires_spec_file(&self) -> bool {
        matches!(
            self,
            PipelineSection::Staging | PipelineSection::Test | PipelineSection::Deploy
        )
    }
}

impl std::fmt::Display for PipelineSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineSection::Build => write!(f, "Build"),
            PipelineSection::Staging => write!(f, "Staging"),
            PipelineSection::Test => write!(f, "Test"),
            PipelineSection::Approval => write!(f, "Approval"),
            PipelineSection::Deploy => write!(f, "Deploy"),
        }
    }
}

/// Delivery pipeline of one deployable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub repo: RepositoryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<StageOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<StageOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<StageOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<StageOption>,
}

impl PipelineConfig {
    /// A pipeline with only a source repository and no optional stages.
    pub fn from_repo(repo: RepositoryConfig) -> Self {
        Self {
            repo,
            build: None,
            staging: None,
            test: None,
            approval: None,
            deploy: None,
        }
    }

    /// The stage option configured for `section` (`None` for `Build`, which has no toggle).
    pub fn stage_option(&self, section: PipelineSection) -> Option<&StageOption> {
        match section {
            PipelineSection::Build => None,
            PipelineSection::Staging => self.staging.as_ref(),
            PipelineSection::Test => self.test.as_ref(),
            PipelineSection::Approval => self.approval.as_ref(),
            PipelineSection::Deploy => self.deploy.as_ref(),
        }
    }

    pub fn test_enabled(&self) -> bool {
        is_enabled(&self.test)
    }

    pub fn approval_enabled(&self) -> bool {
        is_enabled(&self.approval)
    }

    pub fn staging_enabled(&self) -> bool {
        is_enabled(&self.staging)
    }

    pub fn deploy_enabled(&self) -> bool {
        is_enabled(&self.deploy)
    }
}

fn is_enabled(option: &Option<StageOption>) -> bool {
    option.as_ref().is_some_and(|o| o.enabled)
}

/// Database backing a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum DatabaseConfig {
    /// Provider-managed serverless database.
    ManagedServerless { pipeline: PipelineConfig },
    /// Database image run as a container task on the shared cluster.
    CustomContainer {
        cpu: u32,
        mem: u32,
        pipeline: PipelineConfig,
    },
}

impl DatabaseConfig {
    pub fn pipeline(&self) -> &PipelineConfig {
        match self {
            DatabaseConfig::ManagedServerless { pipeline }
            | DatabaseConfig::CustomContainer { pipeline, .. } => pipeline,
        }
    }

    pub fn kind(&self) -> DeployableKind {
        match self {
            DatabaseConfig::ManagedServerless { .. } => DeployableKind::ManagedServerlessDatabase,
            DatabaseConfig::CustomContainer { .. } => DeployableKind::CustomContainerDatabase,
        }
    }
}

/// Application of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum ApplicationConfig {
    /// Container image run as a serverless function.
    ServerlessContainer {
        #[serde(rename = "memoryMB")]
        memory_mb: u32,
        pipeline: PipelineConfig,
    },
    /// Container service on the shared cluster.
    ManagedContainer { pipeline: PipelineConfig },
}

impl ApplicationConfig {
    pub fn pipeline(&self) -> &PipelineConfig {
        match self {
            ApplicationConfig::ServerlessContainer { pipeline, .. }
            | ApplicationConfig::ManagedContainer { pipeline } => pipeline,
        }
    }

    pub fn kind(&self) -> DeployableKind {
        match self {
            ApplicationConfig::ServerlessContainer { .. } => DeployableKind::ServerlessContainerApp,
            ApplicationConfig::ManagedContainer { .. } => DeployableKind::ManagedContainerApp,
        }
    }
}

/// Pipeline delivering the architecture document itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchitecturePipelineConfig {
    /// Name the deployed architecture is known by.
    pub id: String,
    pub pipeline: PipelineConfig,
}

/// Static site served through the CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    pub id: ServiceId,
    pub db: DatabaseConfig,
    pub app: ApplicationConfig,
}

/// Shared network every service is placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Private DNS namespace used for service discovery.
    pub namespace: String,
    pub availability_zone_count: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicesConfig {
    pub network: NetworkConfig,
    pub services: Vec<ServiceConfig>,
}

/// The whole decoded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchitectureConfig {
    #[serde(rename = "archi", skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<ArchitecturePipelineConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteConfig>,
    #[serde(flatten)]
    pub services: ServicesConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hosted() -> RepositoryConfig {
        RepositoryConfig::Hosted {
            name: "orders-repo".to_string(),
            create_if_missing: true,
        }
    }

    #[test]
    fn test_repository_serialises_to_tagged_tree() {
        let repo = RepositoryConfig::External {
            name: "web".to_string(),
            owner: "acme".to_string(),
            credential_ref: CredentialRef::new("github-token"),
        };
        assert_eq!(
            serde_json::to_value(&repo).unwrap(),
            json!({"kind": "External", "name": "web", "owner": "acme", "credentialRef": "github-token"})
        );
    }

    #[test]
    fn test_application_memory_field_name() {
        let app = ApplicationConfig::ServerlessContainer {
            memory_mb: 256,
            pipeline: PipelineConfig::from_repo(hosted()),
        };
        let tree = serde_json::to_value(&app).unwrap();
        assert_eq!(tree["kind"], "ServerlessContainer");
        assert_eq!(tree["memoryMB"], 256);
        assert_eq!(tree["pipeline"]["repo"]["createIfMissing"], true);
        assert!(tree["pipeline"].get("test").is_none());
    }

    #[test]
    fn test_stage_toggles() {
        let mut pipeline = PipelineConfig::from_repo(hosted());
        assert!(!pipeline.test_enabled());
        pipeline.test = Some(StageOption::enabled("buildspec-test.yml"));
        pipeline.approval = Some(StageOption::default());
        assert!(pipeline.test_enabled());
        assert!(!pipeline.approval_enabled());
    }

    #[test]
    fn test_kinds() {
        let db = DatabaseConfig::CustomContainer {
            cpu: 256,
            mem: 512,
            pipeline: PipelineConfig::from_repo(hosted()),
        };
        assert_eq!(db.kind(), DeployableKind::CustomContainerDatabase);
        assert_eq!(db.pipeline().repo.name(), "orders-repo");
    }
}
