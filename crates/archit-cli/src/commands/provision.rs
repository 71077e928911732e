//! Provision command: assembly followed by the dry-run hand-off.

use anyhow::{Context, Result};
use archit_composer::{AssemblyEvent, AssemblyObserver};
use archit_provisioner::{DryRunProvisioner, EnvCredentialResolver, provision_all};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::plan::assemble;
use crate::DocumentArgs;

/// Forwards assembly events to an async consumer.
pub struct ChannelObserver(pub mpsc::UnboundedSender<AssemblyEvent>);

impl AssemblyObserver for ChannelObserver {
    fn on_event(&mut self, event: &AssemblyEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.0.send(event.clone());
    }
}

fn log_event(event: &AssemblyEvent) {
    match event {
        AssemblyEvent::InfrastructureReady { cluster } => {
            info!(cluster, "Shared infrastructure laid out");
        }
        AssemblyEvent::ResolutionChanged { deployable, state } => {
            info!(%deployable, %state, "Resolution");
        }
        AssemblyEvent::PlanReady {
            deployable,
            plan,
            stages,
        } => {
            info!(%deployable, %plan, stages, "Stage plan ready");
        }
    }
}

pub async fn provision(args: &DocumentArgs) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    // The observer owns the sender, so the progress task ends with assembly.
    let plan = assemble(args, &mut ChannelObserver(tx));
    progress.await.context("Progress reporting failed")?;
    let plan = plan?;

    let credentials = Arc::new(EnvCredentialResolver::from_process_env());
    let provisioner = DryRunProvisioner::new(credentials);
    let refs = provision_all(&provisioner, &plan)
        .await
        .context("Provisioning failed")?;

    for provisioned in refs {
        println!("{:<16} {}", provisioned.deployable.to_string(), provisioned.reference);
    }
    Ok(())
}
