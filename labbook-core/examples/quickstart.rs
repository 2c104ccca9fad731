//! Register a toy project, create an experiment, and persist a checkpoint.
//!
//! ```text
//! LABBOOK_OUTPUT_DIR=/tmp/exp cargo run -p labbook-core --example quickstart
//! ```

use labbook_core::{
    Capability, ComponentDefinition, ComponentRegistry, ExperimentConfig, ExperimentManager,
    LabbookSettings, logging,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug)]
struct Mlp {
    hidden: usize,
}

impl ComponentDefinition for Mlp {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::TrainableModel]
    }
}

#[derive(Debug)]
struct MlpTrainer {
    learning_rate: f64,
}

impl ComponentDefinition for MlpTrainer {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::Trainer]
    }
}

#[derive(Debug)]
struct MlpParameters;

impl ComponentDefinition for MlpParameters {
    fn capabilities(&self) -> &[Capability] {
        &[Capability::ParameterSchema]
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Checkpoint {
    epoch: u32,
    loss: f64,
}

fn main() -> anyhow::Result<()> {
    let workspace = std::env::current_dir()?;
    let settings = LabbookSettings::load(Some(&workspace))?;
    let _guard = logging::init_tracing(&settings.log)?;

    let mut registry = ComponentRegistry::new();
    registry.register_model_type(
        "demo",
        "Mlp",
        Mlp { hidden: 128 },
        MlpTrainer {
            learning_rate: 1e-3,
        },
        MlpParameters,
    )?;
    let manager = ExperimentManager::new(Arc::new(registry));

    let config = ExperimentConfig::new(
        "demo",
        "mlp",
        serde_yaml::from_str("layers: 3\nhidden: 128\n")?,
    );
    let experiment = manager.create(config, &settings.output_dir)?;

    let model = experiment
        .model()
        .downcast_ref::<Mlp>()
        .ok_or_else(|| anyhow::anyhow!("unexpected model definition"))?;
    let trainer = experiment
        .trainer()
        .downcast_ref::<MlpTrainer>()
        .ok_or_else(|| anyhow::anyhow!("unexpected trainer definition"))?;
    tracing::info!(
        hidden = model.hidden,
        learning_rate = trainer.learning_rate,
        "Resolved components"
    );

    experiment.save_checkpoint(&Checkpoint { epoch: 1, loss: 0.42 }, "e1")?;
    let restored: Checkpoint = experiment.load_checkpoint("e1")?;
    tracing::info!(epoch = restored.epoch, loss = restored.loss, "Restored checkpoint");

    let reopened = manager.open(experiment.path())?;
    println!(
        "{} ({} checkpoint(s))",
        reopened.path().display(),
        reopened.list(labbook_core::StoreCategory::Checkpoints)?.len()
    );
    Ok(())
}
