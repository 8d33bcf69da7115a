//! Typed JSON document persistence

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{IoOperation, StorageError, StorageResult};

/// A single JSON document stored at a fixed path
///
/// Missing files read back as the document's `Default`; writes go through a
/// temporary file and a rename so a crash mid-write never leaves a
/// half-written document behind.
pub struct JsonStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Create a store backed by the given file path
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or its default if the file does not exist
    pub fn load_or_default(&self) -> StorageResult<T> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "document does not exist, using default");
            return Ok(T::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::io_error(self.path.clone(), IoOperation::Read, e))?;

        serde_json::from_str(&content).map_err(|e| StorageError::ParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Persist the document, creating parent directories as needed
    pub fn save(&self, value: &T) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::SerializeError {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| StorageError::io_error(tmp_path.clone(), IoOperation::Write, e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| StorageError::io_error(self.path.clone(), IoOperation::Rename, e))?;

        Ok(())
    }
}
