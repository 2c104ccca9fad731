//! Named blob persistence for checkpoints and results.
//!
//! A blob file is a single JSON header line followed by the compact JSON
//! payload:
//!
//! ```text
//! {"format":"labbook-blob","version":1,"checksum":"<sha256>","saved_at":"..."}
//! {"epoch":1}
//! ```
//!
//! The checksum covers the payload bytes. Writes go straight to the target
//! file (last writer wins); a crash mid-write leaves a blob that fails the
//! checksum and is reported as [`LabError::Deserialization`] on load.

use crate::error::{LabError, Result};
use crate::experiment::Experiment;
use crate::finite::find_non_finite;
use crate::layout::LayoutEntry;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const BLOB_FORMAT: &str = "labbook-blob";
pub const BLOB_VERSION: u32 = 1;

/// Layout directories that hold named blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCategory {
    Checkpoints,
    Results,
}

impl StoreCategory {
    pub fn layout_entry(self) -> LayoutEntry {
        match self {
            StoreCategory::Checkpoints => LayoutEntry::Checkpoints,
            StoreCategory::Results => LayoutEntry::Results,
        }
    }
}

impl fmt::Display for StoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.layout_entry(), f)
    }
}

impl FromStr for StoreCategory {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "checkpoints" => Ok(StoreCategory::Checkpoints),
            "results" => Ok(StoreCategory::Results),
            other => Err(LabError::unknown_category(other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BlobHeader {
    format: String,
    version: u32,
    checksum: String,
    saved_at: DateTime<Utc>,
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// JSON cannot carry `NaN` or `±inf`, so blobs holding them are refused
/// rather than written with `null` in their place.
pub(crate) fn encode_blob<T: Serialize + ?Sized>(blob: &T) -> Result<Vec<u8>> {
    if let Some((field, value)) = find_non_finite(blob) {
        return Err(LabError::NonFiniteFloat { field, value });
    }
    let payload = serde_json::to_vec(blob)?;
    let header = BlobHeader {
        format: BLOB_FORMAT.to_string(),
        version: BLOB_VERSION,
        checksum: sha256_hex(&payload),
        saved_at: Utc::now(),
    };
    let mut bytes = serde_json::to_vec(&header)?;
    bytes.push(b'\n');
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub(crate) fn decode_blob<T: DeserializeOwned>(bytes: &[u8], path: &Path) -> Result<T> {
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| LabError::deserialization(path, "missing blob header"))?;
    let (head, payload) = (&bytes[..split], &bytes[split + 1..]);

    let header: BlobHeader = serde_json::from_slice(head)
        .map_err(|e| LabError::deserialization(path, format!("invalid blob header: {e}")))?;
    if header.format != BLOB_FORMAT {
        return Err(LabError::deserialization(
            path,
            format!("unexpected blob format '{}'", header.format),
        ));
    }
    if header.version != BLOB_VERSION {
        return Err(LabError::deserialization(
            path,
            format!("unsupported blob version {}", header.version),
        ));
    }
    if sha256_hex(payload) != header.checksum {
        return Err(LabError::deserialization(path, "checksum mismatch"));
    }

    serde_json::from_slice(payload).map_err(|e| LabError::deserialization(path, e))
}

/// A blob name must be a single plain path component.
fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(LabError::InvalidBlobName {
            name: name.to_string(),
        }),
    }
}

impl Experiment {
    fn category_dir(&self, category: StoreCategory) -> PathBuf {
        self.layout().path(category.layout_entry())
    }

    fn blob_path(&self, category: StoreCategory, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.category_dir(category).join(name))
    }

    /// Serialize `blob` to `<category>/<name>`, overwriting any previous blob.
    pub fn save<T: Serialize + ?Sized>(
        &self,
        blob: &T,
        category: StoreCategory,
        name: &str,
    ) -> Result<()> {
        let path = self.blob_path(category, name)?;
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Err(LabError::path_not_found(dir));
        }
        let bytes = encode_blob(blob)?;
        std::fs::write(&path, &bytes)?;
        debug!(path = %path.display(), size_bytes = bytes.len(), "Saved blob");
        Ok(())
    }

    /// Load the blob at `<category>/<name>`.
    pub fn load<T: DeserializeOwned>(&self, category: StoreCategory, name: &str) -> Result<T> {
        let path = self.blob_path(category, name)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LabError::path_not_found(&path));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "Loading blob");
        decode_blob(&bytes, &path)
    }

    /// Whether a blob exists. Any error counts as absent.
    pub fn exists(&self, category: StoreCategory, name: &str) -> bool {
        self.blob_path(category, name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Sorted names of the blobs in a category.
    pub fn list(&self, category: StoreCategory) -> Result<Vec<String>> {
        let dir = self.category_dir(category);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LabError::path_not_found(&dir));
            }
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn save_checkpoint<T: Serialize + ?Sized>(&self, checkpoint: &T, name: &str) -> Result<()> {
        self.save(checkpoint, StoreCategory::Checkpoints, name)
    }

    pub fn load_checkpoint<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.load(StoreCategory::Checkpoints, name)
    }

    pub fn has_checkpoint(&self, name: &str) -> bool {
        self.exists(StoreCategory::Checkpoints, name)
    }

    pub fn save_results<T: Serialize + ?Sized>(&self, results: &T, name: &str) -> Result<()> {
        self.save(results, StoreCategory::Results, name)
    }

    pub fn load_results<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.load(StoreCategory::Results, name)
    }

    pub fn has_results(&self, name: &str) -> bool {
        self.exists(StoreCategory::Results, name)
    }

    /// Directory for an external tensorboard writer.
    ///
    /// With a run name, the run subdirectory is created if needed.
    pub fn tensorboard_dir(&self, run: Option<&str>) -> Result<PathBuf> {
        let base = self.layout().tensorboard();
        match run {
            Some(run) => {
                validate_name(run)?;
                let dir = base.join(run);
                std::fs::create_dir_all(&dir)?;
                Ok(dir)
            }
            None => Ok(base),
        }
    }

    /// Path for a figure file under `figures/`.
    pub fn figure_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.layout().figures().join(name))
    }
}
