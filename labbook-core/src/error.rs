//! Error types for labbook.
//!
//! Uses `thiserror` for a single public error enum covering component
//! resolution, experiment lifecycle and blob persistence.

use std::fmt;
use std::path::{Path, PathBuf};

/// Which level of the module tree failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLevel {
    /// `<project>.models.<model_type>`
    ModelType,
    /// `<project>.models.<model_type>.<component_type>`
    ComponentType,
}

impl fmt::Display for ModuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleLevel::ModelType => write!(f, "model type"),
            ModuleLevel::ComponentType => write!(f, "component type"),
        }
    }
}

/// Top-level error type for labbook operations.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("Module not found for {level} '{name}': {path}")]
    ModuleNotFound {
        level: ModuleLevel,
        name: String,
        path: String,
    },

    #[error("Component '{name}' not found in module {module}")]
    ComponentNotFound { name: String, module: String },

    #[error("Component '{name}' already registered in module {module}")]
    DuplicateComponent { name: String, module: String },

    #[error("Invalid module path: '{path}'")]
    InvalidModulePath { path: String },

    #[error("Experiment directory already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Invalid experiment config at {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("Path not found: {}", .path.display())]
    PathNotFound { path: PathBuf },

    #[error("Unknown category '{category}'")]
    UnknownCategory { category: String },

    #[error("Invalid blob name '{name}'")]
    InvalidBlobName { name: String },

    #[error("Cannot persist non-finite float {value} at {field}")]
    NonFiniteFloat { field: String, value: f64 },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Cannot deserialize {}: {reason}", .path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LabError {
    pub fn invalid_config(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn path_not_found(path: impl AsRef<Path>) -> Self {
        Self::PathNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn deserialization(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self::Deserialization {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn unknown_category(category: impl Into<String>) -> Self {
        Self::UnknownCategory {
            category: category.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = LabError> = std::result::Result<T, E>;
