//! Provisioning backends for Archit.
//!
//! Provides:
//! - A dry-run provisioner (logs, derives deterministic references)
//! - An environment-backed credential resolver
//! - The sequential hand-off of an assembled plan to a provisioner

pub mod dry_run;
pub mod env;
pub mod handoff;

pub use archit_core::credential::{CredentialResolver, SecretValue};
pub use archit_core::provision::{ProvisionedRef, Provisioner};
pub use dry_run::DryRunProvisioner;
pub use env::EnvCredentialResolver;
pub use handoff::provision_all;
