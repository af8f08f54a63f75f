//! Whole-file reads and writes addressed by project name and relative path.

#![allow(missing_docs)]

use std::io::ErrorKind;

use tracing::debug;

use crate::error::ApiError;
use crate::paths::{normalize_relative_path, DataRoot, CATEGORIES};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: DataRoot,
}

impl FileStore {
    #[must_use]
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    /// Reads the whole file; invalid UTF-8 is replaced rather than rejected.
    pub fn read(&self, project: &str, path: &str) -> Result<String, ApiError> {
        let full = self.root.resolve(project, path)?;
        if !full.is_file() {
            return Err(ApiError::not_found("File not found"));
        }
        let bytes = std::fs::read(&full).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ApiError::not_found("File not found"),
            _ => ApiError::internal("Failed to read file", &err),
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Creates an empty file, truncating an existing one.
    pub fn create_file(&self, project: &str, path: &str) -> Result<(), ApiError> {
        let full = self.root.resolve(project, path)?;
        std::fs::File::create(&full)
            .map_err(|err| ApiError::internal("Failed to create file", &err))?;
        debug!(path = %full.display(), "file created");
        Ok(())
    }

    /// Creates the folder and any missing parents; an existing folder is fine.
    pub fn create_folder(&self, project: &str, path: &str) -> Result<(), ApiError> {
        let full = self.root.resolve(project, path)?;
        std::fs::create_dir_all(&full)
            .map_err(|err| ApiError::internal("Failed to create folder", &err))?;
        debug!(path = %full.display(), "folder created");
        Ok(())
    }

    /// Truncate-writes `content`. Parent folders are not created.
    pub fn update(&self, project: &str, path: &str, content: &str) -> Result<(), ApiError> {
        let full = self.root.resolve(project, path)?;
        std::fs::write(&full, content)
            .map_err(|err| ApiError::internal("Failed to update file", &err))?;
        Ok(())
    }

    pub fn delete(&self, project: &str, path: &str) -> Result<(), ApiError> {
        let relative = normalize_relative_path(path)?;
        if relative.components().count() == 1
            && CATEGORIES.iter().any(|category| relative.as_os_str() == *category)
        {
            return Err(ApiError::invalid(format!(
                "Cannot delete project folder '{}'",
                relative.display()
            )));
        }
        let full = self.root.resolve(project, path)?;
        let metadata = match std::fs::symlink_metadata(&full) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ApiError::not_found("File not found"));
            }
            Err(err) => return Err(ApiError::internal("Failed to delete file", &err)),
        };
        let removed = if metadata.is_dir() {
            std::fs::remove_dir_all(&full)
        } else {
            std::fs::remove_file(&full)
        };
        removed.map_err(|err| ApiError::internal("Failed to delete file", &err))?;
        debug!(path = %full.display(), "entry deleted");
        Ok(())
    }
}
