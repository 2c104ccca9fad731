//! Experiment directory layout.

use crate::error::{LabError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fixed entries of an experiment directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutEntry {
    Config,
    Checkpoints,
    Results,
    Tensorboard,
    Figures,
}

impl LayoutEntry {
    pub const ALL: [LayoutEntry; 5] = [
        LayoutEntry::Config,
        LayoutEntry::Checkpoints,
        LayoutEntry::Results,
        LayoutEntry::Tensorboard,
        LayoutEntry::Figures,
    ];

    /// Entries that are directories (everything but the config file).
    pub const DIRECTORIES: [LayoutEntry; 4] = [
        LayoutEntry::Checkpoints,
        LayoutEntry::Results,
        LayoutEntry::Tensorboard,
        LayoutEntry::Figures,
    ];

    /// Child name under the experiment root.
    pub fn file_name(self) -> &'static str {
        match self {
            LayoutEntry::Config => "config",
            LayoutEntry::Checkpoints => "checkpoints",
            LayoutEntry::Results => "results",
            LayoutEntry::Tensorboard => "tensorboard",
            LayoutEntry::Figures => "figures",
        }
    }
}

impl fmt::Display for LayoutEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for LayoutEntry {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self> {
        LayoutEntry::ALL
            .into_iter()
            .find(|entry| entry.file_name() == s)
            .ok_or_else(|| LabError::unknown_category(s))
    }
}

/// Canonical paths of an experiment rooted at `root`.
///
/// Every path is derived from the root on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathLayout {
    root: PathBuf,
}

impl PathLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, entry: LayoutEntry) -> PathBuf {
        self.root.join(entry.file_name())
    }

    pub fn config(&self) -> PathBuf {
        self.path(LayoutEntry::Config)
    }

    pub fn checkpoints(&self) -> PathBuf {
        self.path(LayoutEntry::Checkpoints)
    }

    pub fn results(&self) -> PathBuf {
        self.path(LayoutEntry::Results)
    }

    pub fn tensorboard(&self) -> PathBuf {
        self.path(LayoutEntry::Tensorboard)
    }

    pub fn figures(&self) -> PathBuf {
        self.path(LayoutEntry::Figures)
    }

    /// Path of the entry called `name`, e.g. `"checkpoints"`.
    pub fn path_by_name(&self, name: &str) -> Result<PathBuf> {
        Ok(self.path(name.parse()?))
    }

    /// Create every layout directory. Existing directories are left alone.
    pub fn create_directories(&self) -> Result<()> {
        for entry in LayoutEntry::DIRECTORIES {
            std::fs::create_dir_all(self.path(entry))?;
        }
        Ok(())
    }
}
