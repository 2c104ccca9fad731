//! # labbook-core
//!
//! Convention-based component resolution and on-disk experiment lifecycle.
//!
//! A project registers, for each model type, a model definition, a trainer
//! and a parameter schema in a [`ComponentRegistry`]. An
//! [`ExperimentManager`] resolves those components from an
//! [`ExperimentConfig`], lays out the experiment directory, and gives access
//! to checkpoint and result blobs.
//!
//! ```no_run
//! use labbook_core::{
//!     Capability, ComponentDefinition, ComponentRegistry, ExperimentConfig, ExperimentManager,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Mlp;
//! impl ComponentDefinition for Mlp {
//!     fn capabilities(&self) -> &[Capability] {
//!         &[Capability::TrainableModel]
//!     }
//! }
//! #[derive(Debug)]
//! struct Plain;
//! impl ComponentDefinition for Plain {}
//!
//! # fn main() -> labbook_core::Result<()> {
//! let mut registry = ComponentRegistry::new();
//! registry.register_model_type("demo", "Mlp", Mlp, Plain, Plain)?;
//!
//! let manager = ExperimentManager::new(Arc::new(registry));
//! let config = ExperimentConfig::new("demo", "mlp", serde_yaml::from_str("layers: 3")?);
//! let experiment = manager.create(config, "/tmp/exp")?;
//! experiment.save_checkpoint(&serde_json::json!({"epoch": 1}), "e1")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod experiment;
mod finite;
pub mod layout;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod store;

// Re-export commonly used types at the crate root.
pub use config::ExperimentConfig;
pub use error::{LabError, ModuleLevel, Result};
pub use experiment::{Experiment, ExperimentManager, generate_name};
pub use layout::{LayoutEntry, PathLayout};
pub use registry::{Capability, ComponentDefinition, ComponentRegistry, Member, Module};
pub use resolver::{
    ComponentDescriptor, ComponentKind, ComponentResolver, ResolvedComponent, ResolvedComponents,
};
pub use settings::{LabbookSettings, LogSettings};
pub use store::StoreCategory;
