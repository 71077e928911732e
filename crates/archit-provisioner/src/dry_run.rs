//! Dry-run provisioner.
//!
//! Walks the hand-off exactly as a real backend would, checking what can be
//! checked without touching a cloud account, and reports references derived
//! from the deploy target.

use archit_core::config::RepositoryConfig;
use archit_core::credential::CredentialResolver;
use archit_core::deploy::{DeploySpec, SharedInfra};
use archit_core::provision::{ProvisionedRef, Provisioner};
use archit_core::stage::{StageAction, StagePlan};
use archit_core::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub struct DryRunProvisioner {
    credentials: Arc<dyn CredentialResolver>,
    shared: Mutex<Option<SharedInfra>>,
    provisioned: Mutex<Vec<ProvisionedRef>>,
}

impl DryRunProvisioner {
    pub fn new(credentials: Arc<dyn CredentialResolver>) -> Self {
        Self {
            credentials,
            shared: Mutex::new(None),
            provisioned: Mutex::new(Vec::new()),
        }
    }

    /// References handed out so far, in provisioning order.
    pub async fn provisioned(&self) -> Vec<ProvisionedRef> {
        self.provisioned.lock().await.clone()
    }

    async fn check_source(&self, plan: &StagePlan) -> Result<()> {
        for stage in &plan.stages {
            let StageAction::Source { repository } = &stage.action else {
                continue;
            };
            if let RepositoryConfig::External {
                name,
                owner,
                credential_ref,
            } = repository
            {
                let secret = self.credentials.resolve(credential_ref).await.map_err(|e| {
                    Error::ProvisioningFailed(format!(
                        "source {}/{} of {}: {}",
                        owner, name, plan.deployable, e
                    ))
                })?;
                if secret.token().is_none() {
                    return Err(Error::ProvisioningFailed(format!(
                        "source {}/{} of {}: credential '{}' holds no access token",
                        owner, name, plan.deployable, credential_ref
                    )));
                }
                debug!(deployable = %plan.deployable, credential = %credential_ref, "Source credential available");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for DryRunProvisioner {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn provision_shared(&self, infra: &SharedInfra) -> Result<()> {
        info!(
            vpc = %infra.network.vpc,
            namespace = %infra.network.namespace,
            availability_zones = infra.network.availability_zones,
            cluster = ?infra.cluster.as_ref().map(|c| &c.name),
            build_cache = %infra.build_cache.bucket,
            "Would provision shared infrastructure"
        );
        *self.shared.lock().await = Some(infra.clone());
        Ok(())
    }

    async fn provision(&self, spec: &DeploySpec, plan: &StagePlan) -> Result<ProvisionedRef> {
        if spec.deployable != plan.deployable {
            return Err(Error::InvalidInput(format!(
                "stage plan for {} handed over with deploy spec for {}",
                plan.deployable, spec.deployable
            )));
        }

        {
            let shared = self.shared.lock().await;
            let Some(infra) = shared.as_ref() else {
                return Err(Error::InvalidInput(
                    "shared infrastructure must be provisioned first".to_string(),
                ));
            };
            if let Some(cluster) = &spec.placement.cluster {
                if infra.cluster.as_ref().map(|c| &c.name) != Some(cluster) {
                    return Err(Error::NotFound(format!("cluster '{}'", cluster)));
                }
            }
        }

        self.check_source(plan).await?;

        let reference = format!("dry-run://{}/{}", spec.deployable, spec.target);
        info!(
            deployable = %spec.deployable,
            kind = %spec.kind,
            plan = %plan.id,
            stages = ?plan.kinds(),
            reference = %reference,
            "Would provision deployable"
        );

        let provisioned = ProvisionedRef {
            deployable: spec.deployable.clone(),
            reference,
            provisioned_at: Utc::now(),
        };
        self.provisioned.lock().await.push(provisioned.clone());
        Ok(provisioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnvCredentialResolver;
    use archit_composer::assemble;
    use serde_json::json;
    use std::collections::HashMap;

    fn document() -> serde_json::Value {
        json!({
            "network": {"namespace": "svc", "availabilityZoneCount": 2},
            "services": [{
                "id": "orders",
                "db": {"kind": "CustomContainer", "cpu": 256, "mem": 512,
                       "pipeline": {"repo": {"kind": "Hosted", "name": "orders-db"}}},
                "app": {"kind": "ServerlessContainer", "memoryMB": 256,
                        "pipeline": {"repo": {"kind": "External", "name": "orders",
                                              "owner": "acme", "credentialRef": "github-token"}}}
            }]
        })
    }

    fn provisioner(vars: &[(&str, &str)]) -> DryRunProvisioner {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DryRunProvisioner::new(Arc::new(EnvCredentialResolver::with_vars(vars)))
    }

    #[tokio::test]
    async fn test_provision_requires_shared_first() {
        let plan = assemble(&document()).unwrap();
        let orders = plan.service("orders").unwrap();

        let err = provisioner(&[])
            .provision(&orders.db.spec, &orders.db.plan)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_provision_deterministic_reference() {
        let plan = assemble(&document()).unwrap();
        let orders = plan.service("orders").unwrap();
        let p = provisioner(&[]);

        p.provision_shared(&plan.infra).await.unwrap();
        let db = p.provision(&orders.db.spec, &orders.db.plan).await.unwrap();
        assert_eq!(db.reference, "dry-run://orders/db/task-definition:orders-db");
        assert_eq!(p.provisioned().await.len(), 1);
    }

    #[tokio::test]
    async fn test_external_source_needs_credential() {
        let plan = assemble(&document()).unwrap();
        let orders = plan.service("orders").unwrap();

        let p = provisioner(&[]);
        p.provision_shared(&plan.infra).await.unwrap();
        let err = p
            .provision(&orders.app.spec, &orders.app.plan)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProvisioningFailed(_)));

        let p = provisioner(&[("ARCHIT_SECRET_GITHUB_TOKEN", "ghp_123")]);
        p.provision_shared(&plan.infra).await.unwrap();
        assert!(p.provision(&orders.app.spec, &orders.app.plan).await.is_ok());
    }

    #[tokio::test]
    async fn test_map_credential_needs_token_key() {
        let plan = assemble(&document()).unwrap();
        let orders = plan.service("orders").unwrap();

        let p = provisioner(&[("ARCHIT_SECRET_GITHUB_TOKEN", r#"{"user": "bot"}"#)]);
        p.provision_shared(&plan.infra).await.unwrap();
        let err = p
            .provision(&orders.app.spec, &orders.app.plan)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProvisioningFailed(ref m) if m.contains("no access token")));

        let p = provisioner(&[("ARCHIT_SECRET_GITHUB_TOKEN", r#"{"token": "ghp_123"}"#)]);
        p.provision_shared(&plan.infra).await.unwrap();
        assert!(p.provision(&orders.app.spec, &orders.app.plan).await.is_ok());
    }

    #[tokio::test]
    async fn test_mismatched_hand_off() {
        let plan = assemble(&document()).unwrap();
        let orders = plan.service("orders").unwrap();
        let p = provisioner(&[]);
        p.provision_shared(&plan.infra).await.unwrap();

        let err = p
            .provision(&orders.db.spec, &orders.app.plan)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
