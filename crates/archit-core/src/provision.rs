//! Provisioning collaborator.
//!
//! Provisioners turn deploy specs and stage plans into real infrastructure and
//! pipelines. The composer never calls one itself; the caller hands over a
//! complete assembly, shared infrastructure first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::{DeploySpec, SharedInfra};
use crate::stage::StagePlan;
use crate::{DeployableId, Result};

/// Stable reference reported back for a provisioned deployable.
/// Later deploy stages address the deployable through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedRef {
    pub deployable: DeployableId,
    pub reference: String,
    pub provisioned_at: DateTime<Utc>,
}

/// Trait for provisioning backends.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Name of this provisioner.
    fn name(&self) -> &'static str;

    /// Create the infrastructure shared by all services.
    async fn provision_shared(&self, infra: &SharedInfra) -> Result<()>;

    /// Create one deployable and its pipeline.
    async fn provision(&self, spec: &DeploySpec, plan: &StagePlan) -> Result<ProvisionedRef>;
}
