//! Hand-off of an assembled plan to a provisioner.

use archit_composer::ArchitecturePlan;
use archit_core::Result;
use archit_core::provision::{ProvisionedRef, Provisioner};
use tracing::{error, info};

/// Provision shared infrastructure, then every deployable in plan order.
///
/// Stops at the first failure; references handed out before it are returned
/// by the provisioner, not rolled back here.
pub async fn provision_all(
    provisioner: &dyn Provisioner,
    plan: &ArchitecturePlan,
) -> Result<Vec<ProvisionedRef>> {
    info!(provisioner = provisioner.name(), "Starting provisioning hand-off");
    provisioner.provision_shared(&plan.infra).await?;

    let mut refs = Vec::new();
    for deployable in plan.deployables() {
        match provisioner.provision(&deployable.spec, &deployable.plan).await {
            Ok(provisioned) => refs.push(provisioned),
            Err(e) => {
                error!(deployable = %deployable.spec.deployable, error = %e, "Provisioning failed");
                return Err(e);
            }
        }
    }

    info!(deployables = refs.len(), "Provisioning hand-off complete");
    Ok(refs)
}
