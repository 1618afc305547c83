//! Artifact store for the file-system handoff between stages
//!
//! Payloads are `bincode`-encoded serde values, opaque outside the pipeline.
//! A batch is committed all-or-nothing: everything is serialized in memory,
//! staged as hidden temp files next to the destination, then renamed into
//! place. Any failure removes the staged files and leaves no final artifact
//! of the batch behind.

use crate::errors::{PipelineError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Well-known artifact file names
pub mod names {
    pub const X_TRAIN: &str = "X_train.bin";
    pub const X_TEST: &str = "X_test.bin";
    pub const Y_TRAIN: &str = "y_train.bin";
    pub const Y_TEST: &str = "y_test.bin";
    pub const SCALER: &str = "scaler.bin";
    pub const ENCODERS: &str = "label_encoders.json";
    pub const MODEL: &str = "model.bin";
    pub const MODEL_HASH: &str = "model.hash";

    /// The four co-indexed partitions stage 2 consumes
    pub const PARTITIONS: [&str; 4] = [X_TRAIN, X_TEST, Y_TRAIN, Y_TEST];
}

/// Encoded class labels, co-indexed with a [`FeatureMatrix`]
pub type Labels = Vec<u32>;

/// Dense row-major feature matrix with named columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { columns, rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when every row has one value per column
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.columns.len())
    }

    /// Copy of the rows at `indices`, in that order
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

/// Serialize a value with the artifact encoding
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| PipelineError::Persistence(format!("serialization failed: {e}")))
}

/// Deserialize a value with the artifact encoding
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| PipelineError::DataLoad(format!("corrupt artifact: {e}")))
}

/// Pretty JSON with object keys in sorted order
///
/// `serde_json::Map` is ordered by key without the `preserve_order` feature,
/// so a round-trip through `Value` is enough to canonicalize.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let canonical = serde_json::to_value(value)
        .and_then(|v| serde_json::to_vec_pretty(&v))
        .map_err(|e| PipelineError::Persistence(format!("json serialization failed: {e}")))?;
    Ok(canonical)
}

/// Hex BLAKE3 digest of an artifact payload
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Named payloads waiting to be committed together
#[derive(Debug, Default)]
pub struct ArtifactBatch {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bincode-encoded value
    pub fn binary<T: Serialize>(mut self, name: &str, value: &T) -> Result<Self> {
        self.entries.push((name.to_string(), to_bytes(value)?));
        Ok(self)
    }

    /// Add a canonical JSON value
    pub fn json<T: Serialize>(mut self, name: &str, value: &T) -> Result<Self> {
        self.entries.push((name.to_string(), to_canonical_json(value)?));
        Ok(self)
    }

    /// Add pre-encoded bytes
    pub fn raw(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.entries.push((name.to_string(), bytes));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directory holding one stage's artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Write every artifact of `batch` or none of them.
    ///
    /// Artifacts already in the directory are moved aside first and restored
    /// if any rename fails, so a failed rerun leaves the previous set intact.
    pub fn commit(&self, batch: ArtifactBatch) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            PipelineError::Persistence(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let pid = std::process::id();
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(batch.len());
        for (name, bytes) in &batch.entries {
            let tmp = self.dir.join(format!(".{name}.tmp-{pid}"));
            if let Err(e) = std::fs::write(&tmp, bytes) {
                let _ = std::fs::remove_file(&tmp);
                Self::discard(&staged);
                return Err(PipelineError::Persistence(format!(
                    "cannot write {}: {e}",
                    tmp.display()
                )));
            }
            debug!("Staged {} ({} bytes)", name, bytes.len());
            staged.push((tmp, self.path_of(name)));
        }

        let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (name, _) in &batch.entries {
            let dest = self.path_of(name);
            if !dest.exists() {
                continue;
            }
            let backup = self.dir.join(format!(".{name}.bak-{pid}"));
            if let Err(e) = std::fs::rename(&dest, &backup) {
                Self::restore(&backups);
                Self::discard(&staged);
                return Err(PipelineError::Persistence(format!(
                    "cannot move aside {}: {e}",
                    dest.display()
                )));
            }
            backups.push((backup, dest));
        }

        for (idx, (tmp, dest)) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(tmp, dest) {
                for (_, landed) in &staged[..idx] {
                    let _ = std::fs::remove_file(landed);
                }
                Self::discard(&staged[idx..]);
                Self::restore(&backups);
                return Err(PipelineError::Persistence(format!(
                    "cannot move artifact into {}: {e}",
                    dest.display()
                )));
            }
        }

        for (backup, _) in &backups {
            let _ = std::fs::remove_file(backup);
        }
        info!("Committed {} artifacts to {}", staged.len(), self.dir.display());
        Ok(())
    }

    fn discard(staged: &[(PathBuf, PathBuf)]) {
        for (tmp, _) in staged {
            let _ = std::fs::remove_file(tmp);
        }
    }

    /// Put moved-aside artifacts back in place
    fn restore(backups: &[(PathBuf, PathBuf)]) {
        for (backup, dest) in backups {
            let _ = std::fs::rename(backup, dest);
        }
    }

    /// Read raw artifact bytes
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name);
        std::fs::read(&path)
            .map_err(|e| PipelineError::DataLoad(format!("cannot read {}: {e}", path.display())))
    }

    /// Read and decode a bincode artifact
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bytes = self.read(name)?;
        bincode::deserialize(&bytes)
            .map_err(|e| PipelineError::DataLoad(format!("{name}: corrupt artifact: {e}")))
    }

    /// Read and decode a JSON artifact
    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bytes = self.read(name)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::DataLoad(format!("{name}: corrupt json: {e}")))
    }
}
