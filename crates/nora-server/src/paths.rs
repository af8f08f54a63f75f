//! Maps project names and project-relative paths onto the user-data root.

#![allow(missing_docs)]

use std::path::{Component, Path, PathBuf};

use crate::error::ApiError;

/// Manifest file written into every project directory.
pub const MANIFEST_FILE: &str = "nora.json";

/// The four fixed subdirectories of a project, in response order.
pub const CATEGORIES: [&str; 4] = ["objects", "scenes", "scripts", "reports"];

/// Default user-data root: `<home>/Documents/Nora`.
#[must_use]
pub fn default_data_root() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("Nora")
}

#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &str) -> Result<PathBuf, ApiError> {
        validate_project_name(project)?;
        Ok(self.root.join(project))
    }

    pub fn manifest_path(&self, project: &str) -> Result<PathBuf, ApiError> {
        Ok(self.project_dir(project)?.join(MANIFEST_FILE))
    }

    /// Resolves `relative` under the project directory without touching the disk.
    pub fn resolve(&self, project: &str, relative: &str) -> Result<PathBuf, ApiError> {
        let dir = self.project_dir(project)?;
        let relative = normalize_relative_path(relative)?;
        Ok(dir.join(relative))
    }
}

pub fn validate_project_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::invalid("Missing or invalid 'name' field"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ApiError::invalid(format!("Invalid project name '{name}'")));
    }
    Ok(())
}

/// Keeps only normal components; anything that could leave the project is rejected.
pub fn normalize_relative_path(path: &str) -> Result<PathBuf, ApiError> {
    let raw = Path::new(path);
    if raw.is_absolute() {
        return Err(ApiError::invalid("absolute paths are not allowed"));
    }
    let mut normalized = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApiError::invalid("path escapes the project directory"));
            }
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(ApiError::invalid("Missing or invalid 'path' field"));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;

    #[test]
    fn resolves_under_project_directory() {
        let root = DataRoot::new("/data/Nora");
        let path = root.resolve("demo", "scripts/./a.txt").expect("resolve");
        assert_eq!(path, PathBuf::from("/data/Nora/demo/scripts/a.txt"));
        assert_eq!(
            root.manifest_path("demo").expect("manifest"),
            PathBuf::from("/data/Nora/demo/nora.json")
        );
    }

    #[test]
    fn rejects_escaping_paths_and_names() {
        let root = DataRoot::new("/data/Nora");
        for bad in ["../other/x", "/etc/passwd", "scripts/../../x", "", "."] {
            let err = root.resolve("demo", bad).expect_err(bad);
            assert_eq!(err.kind(), ApiErrorKind::InvalidInput, "{bad}");
        }
        for bad in ["", "..", "a/b", "a\\b"] {
            assert!(root.project_dir(bad).is_err(), "{bad}");
        }
    }
}
