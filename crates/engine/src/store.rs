//! Persisted last-observed-value store.
//!
//! A single JSON object mapping listener name to last value. Loaded
//! once at startup (missing or corrupt files are an empty map, logged)
//! and overwritten wholesale after every tick.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

/// Errors from persisting the store. Loading never fails.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct Store {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl Store {
    /// Load the store from disk.
    ///
    /// A missing file is a fresh start; a corrupt file is logged and
    /// treated as empty (last write wins on the next flush).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, Value>>(&contents) {
                Ok(values) => {
                    info!(path = %path.display(), entries = values.len(), "loaded value store");
                    values
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "corrupt value store, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, values }
    }

    /// In-memory store for tests and single-shot runs without a file.
    pub fn in_memory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the whole map, writing a temp file first and renaming
    /// over the target to avoid partial writes on crash.
    pub fn flush(&self) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(&self.values)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
