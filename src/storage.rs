//! Persisted key/value store used for the saved endpoint.
//!
//! Persistence is best-effort: callers receive a [`StorageError`] and decide
//! to ignore it, which every caller in this crate does.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key under which the chosen endpoint is stored
pub const API_BASE_KEY: &str = "API_BASE";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON object on disk mapping string keys to string values
#[derive(Debug, Clone)]
pub struct StorageManager {
    path: PathBuf,
}

impl StorageManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StorageManager { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value. A missing file or key is `Ok(None)`.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.read_all()?;
        Ok(items
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Write a value, keeping every other key in the file.
    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking the write
        let mut items = self.read_all().unwrap_or_default();
        items.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(items)).map_err(|source| {
            StorageError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(|source| self.io_error(source))
    }

    fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|source| StorageError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
