//! Data-directory resolution

use std::path::PathBuf;

use crate::error::{StorageError, StorageResult};

/// Resolves where JobCraft keeps its local state
pub struct PathResolver;

impl PathResolver {
    /// Resolve the JobCraft data directory under the user data dir
    pub fn resolve_data_dir() -> StorageResult<PathBuf> {
        let base = dirs::data_dir().ok_or_else(|| StorageError::PathResolutionError {
            message: "cannot determine user data directory".to_string(),
        })?;
        Ok(base.join("jobcraft"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_ends_with_app_name() {
        let dir = PathResolver::resolve_data_dir().unwrap();
        assert!(dir.ends_with("jobcraft"));
    }
}
