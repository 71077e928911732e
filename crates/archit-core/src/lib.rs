//! Core domain types and traits for the Archit topology composer.
//!
//! This crate contains:
//! - Identifiers for services, deployables and plans
//! - Typed configuration records (repository, pipeline, database, application)
//! - Deploy specs and shared infrastructure references
//! - Stage plans and artifact wiring
//! - Collaborator traits (provisioning, credentials)

pub mod config;
pub mod credential;
pub mod deploy;
pub mod error;
pub mod id;
pub mod provision;
pub mod stage;

pub use error::{Error, Result};
pub use id::{DeployableId, PlanId, Role, ServiceId};
