//! Plan command.

use anyhow::Result;
use archit_composer::{ArchitecturePlan, AssemblyObserver, DeployablePlan, assemble_config};
use archit_core::stage::StageAction;
use std::fmt;

use super::load;
use crate::{DocumentArgs, OutputFormat};

pub fn plan(args: &DocumentArgs, format: OutputFormat) -> Result<()> {
    let plan = assemble(args, &mut ())?;
    match format {
        OutputFormat::Text => print!("{}", PlanSummary(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

/// Load and assemble the document named by `args`.
pub fn assemble(args: &DocumentArgs, observer: &mut dyn AssemblyObserver) -> Result<ArchitecturePlan> {
    let config = load(args)?;
    Ok(assemble_config(&config, observer)?)
}

/// Human-readable summary of a plan.
pub struct PlanSummary<'a>(pub &'a ArchitecturePlan);

impl fmt::Display for PlanSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.0;
        let infra = &plan.infra;
        writeln!(
            f,
            "Network: {} ({} AZ, namespace {})",
            infra.network.vpc, infra.network.availability_zones, infra.network.namespace
        )?;
        match &infra.cluster {
            Some(cluster) => writeln!(f, "Cluster: {}", cluster.name)?,
            None => writeln!(f, "Cluster: none")?,
        }
        writeln!(f, "Build cache: {}", infra.build_cache.bucket)?;

        if let Some(architecture) = &plan.architecture {
            writeln!(f, "\nArchitecture pipeline")?;
            write_deployable(f, architecture)?;
        }
        if let Some(site) = &plan.site {
            writeln!(f, "\nSite")?;
            write_deployable(f, site)?;
        }
        for service in &plan.services {
            writeln!(f, "\nService {}", service.id)?;
            write_deployable(f, &service.db)?;
            write_deployable(f, &service.app)?;
        }
        Ok(())
    }
}

fn write_deployable(f: &mut fmt::Formatter<'_>, deployable: &DeployablePlan) -> fmt::Result {
    let spec = &deployable.spec;
    writeln!(f, "  {} [{}] -> {}", spec.deployable, spec.kind, spec.target)?;
    if let Some(discovery) = &spec.discovery {
        writeln!(f, "    discovery: {}", discovery.hostname())?;
    }
    writeln!(f, "    plan {}", deployable.plan.id)?;
    for stage in &deployable.plan.stages {
        let detail = match &stage.action {
            StageAction::Source { repository } => repository.name().to_string(),
            StageAction::Build(profile) => match (&profile.spec_file, &profile.registry) {
                (Some(spec_file), _) => spec_file.clone(),
                (None, Some(registry)) => format!("image -> {}", registry),
                (None, None) => profile.commands.join(" && "),
            },
            StageAction::Test { spec_file, .. } => spec_file.clone(),
            StageAction::Approval => "manual".to_string(),
            StageAction::Deploy { target, spec_file } => match spec_file {
                Some(spec_file) => format!("{} ({})", target, spec_file),
                None => target.to_string(),
            },
            StageAction::Invalidate { target } => target.to_string(),
        };
        writeln!(f, "    - {:<10} {}", stage.name, detail)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use archit_composer::assemble as assemble_tree;
    use serde_json::json;

    #[test]
    fn test_render_plan() {
        let plan = assemble_tree(&json!({
            "archi": {"id": "shop", "pipeline": {"repo": {"kind": "Hosted", "name": "shop-infra"}}},
            "network": {"namespace": "svc", "availabilityZoneCount": 2},
            "services": [{
                "id": "orders",
                "db": {"kind": "CustomContainer", "cpu": 256, "mem": 512,
                       "pipeline": {"repo": {"kind": "Hosted", "name": "orders-db"}}},
                "app": {"kind": "ServerlessContainer", "memoryMB": 256,
                        "pipeline": {"repo": {"kind": "Hosted", "name": "orders-app"},
                                     "test": {"enabled": true, "specFile": "buildspec-test.yml"}}}
            }]
        }))
        .unwrap();

        let text = PlanSummary(&plan).to_string();
        assert!(text.contains("Cluster: svc-cluster"));
        assert!(text.contains("architecture [architecture_pipeline] -> architecture:shop"));
        assert!(text.contains("- Synth      archit validate"));
        assert!(text.contains("Service orders"));
        assert!(text.contains("orders/db [custom_container_database] -> task-definition:orders-db"));
        assert!(text.contains("discovery: orders-db.svc"));
        assert!(text.contains("- Test       buildspec-test.yml"));
        assert!(text.contains("image -> orders-app"));
    }
}
