//! Configuration loading and decoding for the Archit topology composer.
//!
//! This crate handles:
//! - Loading YAML/JSON architecture documents
//! - Variable interpolation (`${env.NAME}`, `${name}`)
//! - Decoding the untyped tree into typed, validated records

pub mod decode;
pub mod error;
pub mod limits;
pub mod loader;
pub mod variables;

pub use decode::{Tree, TypedConfig, decode, decode_architecture};
pub use error::{Category, ConfigError, ConfigResult, DecodeError, DecodeReason, DecodeResult};
pub use loader::{load_architecture, load_document, parse_document};
pub use variables::{VariableContext, VariableContextBuilder};
