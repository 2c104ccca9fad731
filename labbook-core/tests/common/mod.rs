//! Shared fixtures: a small `demo` project with two model types.

#![allow(dead_code)]

use labbook_core::{Capability, ComponentDefinition, ComponentRegistry, ExperimentConfig};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
pub struct MlpModel {
    pub hidden: usize,
}

impl ComponentDefinition for MlpModel {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::TrainableModel]
    }
}

#[derive(Debug)]
pub struct MlpTrainer;

impl ComponentDefinition for MlpTrainer {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::Trainer]
    }
}

#[derive(Debug)]
pub struct MlpParameters;

impl ComponentDefinition for MlpParameters {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::ParameterSchema]
    }
}

/// `demo.models.mlp` fully registered, `demo.models.resnet` with a model only.
pub fn demo_registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry
        .register_model_type(
            "demo",
            "Mlp",
            MlpModel { hidden: 64 },
            MlpTrainer,
            MlpParameters,
        )
        .unwrap();
    registry
        .define("demo.models.resnet.model", "ResNet", MlpModel { hidden: 512 })
        .unwrap();
    Arc::new(registry)
}

pub fn demo_config() -> ExperimentConfig {
    ExperimentConfig::new("demo", "mlp", serde_yaml::from_str("layers: 3").unwrap())
}
