//! Concentration risk configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for model.json and policy.json
//! - Path resolution for config files and the learning record
//! - Semantic validation
//! - Config snapshots so a diagnosis can be traced to its inputs

pub mod model;
pub mod policy;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use model::ModelConfig;
pub use policy::Policy;
pub use resolve::{
    resolve_paths, resolve_paths_with, ConfigFile, ConfigPaths, ConfigSource, Located,
    PathOverrides, ResolveError,
};
pub use snapshot::ConfigSnapshot;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
