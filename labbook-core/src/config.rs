//! Experiment configuration — the `config` file stored at an experiment root.
//!
//! The file is a YAML mapping with three required keys:
//!
//! ```yaml
//! project: demo
//! model_type: mlp
//! parameters:
//!   layers: 3
//! ```
//!
//! `parameters` belongs to the resolved parameter schema and is carried
//! through untouched.

use crate::error::{LabError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::io;
use std::path::Path;
use tracing::debug;

/// Configuration of a single experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub project: String,
    pub model_type: String,
    pub parameters: Value,
}

impl ExperimentConfig {
    pub fn new(project: &str, model_type: &str, parameters: Value) -> Self {
        Self {
            project: project.to_string(),
            model_type: model_type.to_string(),
            parameters,
        }
    }

    /// Check that `project` and `model_type` can name a directory and form
    /// a single segment of a dotted module path.
    ///
    /// `source` is only used for error reporting.
    pub fn validate(&self, source: &Path) -> Result<()> {
        for (key, value) in [("project", &self.project), ("model_type", &self.model_type)] {
            if value.trim().is_empty() {
                return Err(LabError::invalid_config(source, format!("'{key}' is empty")));
            }
            if value.contains(['/', '\\', '.']) {
                return Err(LabError::invalid_config(
                    source,
                    format!("'{key}' is not a valid identifier: {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Build a config from an already parsed YAML value.
    pub fn from_value(value: &Value, source: &Path) -> Result<Self> {
        if !value.is_mapping() {
            return Err(LabError::invalid_config(source, "expected a mapping"));
        }

        let string_key = |key: &str| -> Result<String> {
            match value.get(key) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(LabError::invalid_config(
                    source,
                    format!("'{key}' must be a string"),
                )),
                None => Err(LabError::invalid_config(
                    source,
                    format!("missing required key '{key}'"),
                )),
            }
        };

        let project = string_key("project")?;
        let model_type = string_key("model_type")?;
        let parameters = value.get("parameters").cloned().ok_or_else(|| {
            LabError::invalid_config(source, "missing required key 'parameters'")
        })?;

        let config = Self {
            project,
            model_type,
            parameters,
        };
        config.validate(source)?;
        Ok(config)
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str, source: &Path) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| LabError::invalid_config(source, e.to_string()))?;
        Self::from_value(&value, source)
    }

    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LabError::path_not_found(path));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "Loaded experiment config");
        Self::from_yaml_str(&text, path)
    }

    /// Serialize the config to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        atomic_write(path, yaml.as_bytes())?;
        Ok(())
    }
}

/// Write to a `.tmp` sibling, then rename over the target.
fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)
}
