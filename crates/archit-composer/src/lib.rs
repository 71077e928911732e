//! Architecture assembly for Archit.
//!
//! Turns a decoded architecture document into deploy specs and stage plans:
//! shared infrastructure is laid out once, then every deployable is resolved
//! and its delivery pipeline planned, in document order.

pub mod assembler;
pub mod infra;
pub mod planner;
pub mod resolver;

pub use assembler::{
    ArchitecturePlan, AssembleError, AssemblyEvent, AssemblyObserver, DeployableError,
    DeployablePlan, ServicePlan, assemble, assemble_config, assemble_with,
};
pub use planner::{PlanError, StagePlanner};
pub use resolver::{DeployableConfig, ResolutionState, ResolveEnv, ResolveError, resolve};
