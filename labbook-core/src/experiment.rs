//! Experiment lifecycle — creating and reopening experiment directories.
//!
//! An experiment is a directory named `<project>-<model_type>-<timestamp>`
//! holding the serialized [`ExperimentConfig`] and the fixed [`PathLayout`]
//! subdirectories. The timestamp has second resolution, so two experiments
//! for the same project and model type created within one second collide;
//! the second `create` fails with [`LabError::AlreadyExists`].
//!
//! No locks are taken. Concurrent writers to one experiment directory must
//! coordinate externally.

use crate::config::ExperimentConfig;
use crate::error::{LabError, Result};
use crate::layout::PathLayout;
use crate::registry::ComponentRegistry;
use crate::resolver::{ComponentResolver, ResolvedComponent, ResolvedComponents};
use chrono::{DateTime, Local, TimeZone};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// `strftime` format of the timestamp in experiment names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Generate the directory name of a new experiment.
pub fn generate_name<Tz>(config: &ExperimentConfig, timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}-{}-{}",
        config.project,
        config.model_type,
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// An experiment bound to its directory and resolved components.
#[derive(Debug, Clone)]
pub struct Experiment {
    path: PathBuf,
    config: ExperimentConfig,
    layout: PathLayout,
    components: ResolvedComponents,
}

impl Experiment {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    pub fn components(&self) -> &ResolvedComponents {
        &self.components
    }

    pub fn model(&self) -> &ResolvedComponent {
        &self.components.model
    }

    pub fn trainer(&self) -> &ResolvedComponent {
        &self.components.trainer
    }

    pub fn parameters(&self) -> &ResolvedComponent {
        &self.components.parameters
    }
}

/// Creates and opens experiments against a component registry.
#[derive(Debug, Clone)]
pub struct ExperimentManager {
    resolver: ComponentResolver,
}

impl ExperimentManager {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self::with_resolver(ComponentResolver::new(registry))
    }

    pub fn with_resolver(resolver: ComponentResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ComponentResolver {
        &self.resolver
    }

    /// Create a new experiment under `output_dir`, named with the current time.
    pub fn create(
        &self,
        config: ExperimentConfig,
        output_dir: impl AsRef<Path>,
    ) -> Result<Experiment> {
        self.create_at(config, output_dir, &Local::now())
    }

    /// Create a new experiment named with `timestamp`.
    ///
    /// Components are resolved before anything touches the disk, so a
    /// resolution failure leaves no directory behind.
    pub fn create_at<Tz>(
        &self,
        config: ExperimentConfig,
        output_dir: impl AsRef<Path>,
        timestamp: &DateTime<Tz>,
    ) -> Result<Experiment>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let output_dir = output_dir.as_ref();
        info!(
            project = %config.project,
            model_type = %config.model_type,
            output_dir = %output_dir.display(),
            "Creating experiment"
        );
        config.validate(output_dir)?;

        let path = output_dir.join(generate_name(&config, timestamp));
        if path.exists() {
            error!(path = %path.display(), "Experiment path already exists");
            return Err(LabError::AlreadyExists { path });
        }

        let components = self
            .resolver
            .resolve_all(&config.project, &config.model_type)?;

        std::fs::create_dir_all(output_dir)?;
        match std::fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                error!(path = %path.display(), "Experiment path created concurrently");
                return Err(LabError::AlreadyExists { path });
            }
            Err(e) => return Err(e.into()),
        }

        let layout = PathLayout::new(&path);
        config.save(&layout.config())?;
        layout.create_directories()?;

        info!(path = %path.display(), "Experiment created");
        Ok(Experiment {
            path,
            config,
            layout,
            components,
        })
    }

    /// Read a YAML config file and create an experiment from it.
    pub fn create_from_file(
        &self,
        config_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Experiment> {
        let config_path = config_path.as_ref();
        info!(config = %config_path.display(), "Creating experiment from file");
        let config = ExperimentConfig::load(config_path)?;
        self.create(config, output_dir)
    }

    /// Reopen an existing experiment directory.
    ///
    /// Layout subdirectories are not checked; missing ones surface as
    /// [`LabError::PathNotFound`] on first access.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Experiment> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "Opening experiment");
        let layout = PathLayout::new(&path);
        let config = ExperimentConfig::load(&layout.config())?;
        let components = self
            .resolver
            .resolve_all(&config.project, &config.model_type)?;
        Ok(Experiment {
            path,
            config,
            layout,
            components,
        })
    }
}
