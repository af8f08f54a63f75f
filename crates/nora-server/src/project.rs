//! Project directories: manifest plus the four category folders.

#![allow(missing_docs)]

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::paths::{DataRoot, CATEGORIES, MANIFEST_FILE};
use crate::tree::{self, ProjectFiles};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: DataRoot,
}

impl ProjectStore {
    #[must_use]
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    /// Manifests of every project directory as stored, sorted by directory name.
    ///
    /// Directories whose manifest is missing, unreadable or not a JSON object
    /// are skipped.
    pub fn list(&self) -> Result<Vec<Value>, ApiError> {
        let entries = std::fs::read_dir(self.root.path())
            .map_err(|err| ApiError::internal("Failed to open projects directory", &err))?;
        let mut dirs = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        dirs.sort();

        let mut manifests = Vec::new();
        for dir in dirs {
            if let Some(manifest) = read_manifest_value(&dir.join(MANIFEST_FILE)) {
                manifests.push(manifest);
            }
        }
        Ok(manifests)
    }

    /// Writes the manifest, then the category folders.
    ///
    /// A failure while creating a category folder leaves the manifest and
    /// any folders created so far in place.
    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<ProjectManifest, ApiError> {
        let dir = self.root.project_dir(name)?;
        std::fs::create_dir_all(&dir)
            .map_err(|err| ApiError::internal("Failed to create project directory", &err))?;

        let manifest_path = self.root.manifest_path(name)?;
        // Re-creating an existing project keeps its original creation date.
        let created_at = read_manifest(&manifest_path)
            .map(|existing| existing.created_at)
            .filter(|date| !date.is_empty())
            .unwrap_or_else(today);
        let manifest = ProjectManifest {
            name: name.to_string(),
            description: description.unwrap_or_default().to_string(),
            created_at,
        };
        let text = serde_json::to_string_pretty(&manifest).map_err(|err| {
            ApiError::internal("Failed to create project file", &std::io::Error::other(err))
        })?;
        std::fs::write(&manifest_path, text)
            .map_err(|err| ApiError::internal("Failed to create project file", &err))?;

        for category in CATEGORIES {
            std::fs::create_dir_all(dir.join(category)).map_err(|err| {
                ApiError::internal("Failed to create project subdirectories", &err)
            })?;
        }
        info!(project = name, "project created");
        Ok(manifest)
    }

    pub fn files(&self, name: &str) -> Result<ProjectFiles, ApiError> {
        let dir = self.root.project_dir(name)?;
        if !dir.is_dir() {
            return Err(ApiError::not_found("Project not found"));
        }
        tree::project_files(&dir)
    }
}

fn read_manifest_value(path: &Path) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&text) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            warn!(path = %path.display(), "skipping manifest that is not a JSON object");
            None
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable manifest");
            None
        }
    }
}

fn read_manifest(path: &Path) -> Option<ProjectManifest> {
    serde_json::from_value(read_manifest_value(path)?).ok()
}

/// Current local calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn data_root(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "nora-server-project-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create data root");
        path
    }

    #[test]
    fn create_writes_manifest_and_categories() {
        let root = data_root("create");
        let store = ProjectStore::new(DataRoot::new(&root));

        let manifest = store.create("demo", None).expect("create project");
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.description, "");
        assert_eq!(manifest.created_at, today());
        for category in CATEGORIES {
            assert!(root.join("demo").join(category).is_dir(), "{category}");
        }
        let on_disk: ProjectManifest = serde_json::from_str(
            &std::fs::read_to_string(root.join("demo/nora.json")).expect("read manifest"),
        )
        .expect("parse manifest");
        assert_eq!(on_disk, manifest);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn list_skips_directories_without_manifest() {
        let root = data_root("list");
        let store = ProjectStore::new(DataRoot::new(&root));
        store.create("beta", Some("second")).expect("create beta");
        store.create("alpha", Some("first")).expect("create alpha");
        std::fs::create_dir_all(root.join("half-made")).expect("create bare dir");
        std::fs::create_dir_all(root.join("broken")).expect("create broken dir");
        std::fs::write(root.join("broken/nora.json"), "{ not json").expect("write broken");
        std::fs::write(root.join("stray.txt"), "x").expect("write stray file");

        let names = store
            .list()
            .expect("list projects")
            .into_iter()
            .map(|manifest| manifest["name"].clone())
            .collect::<Vec<_>>();
        assert_eq!(names, vec![json!("alpha"), json!("beta")]);

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn list_returns_manifests_as_stored() {
        let root = data_root("as-stored");
        let store = ProjectStore::new(DataRoot::new(&root));
        for (dir, text) in [
            (
                "p",
                r#"{"name":"p","description":"d","created_at":"2024-01-01","version":3}"#,
            ),
            ("q", r#"{"title":"q"}"#),
            ("r", "[1, 2]"),
        ] {
            std::fs::create_dir_all(root.join(dir)).expect("create project dir");
            std::fs::write(root.join(dir).join(MANIFEST_FILE), text).expect("write manifest");
        }

        let listed = store.list().expect("list projects");
        assert_eq!(
            listed,
            vec![
                json!({ "name": "p", "description": "d", "created_at": "2024-01-01", "version": 3 }),
                json!({ "title": "q" }),
            ]
        );

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn recreate_keeps_created_at() {
        let root = data_root("recreate");
        let store = ProjectStore::new(DataRoot::new(&root));
        store.create("demo", None).expect("create project");
        let manifest_path = root.join("demo/nora.json");
        std::fs::write(
            &manifest_path,
            r#"{"name":"demo","description":"","created_at":"2001-02-03"}"#,
        )
        .expect("backdate manifest");

        let manifest = store.create("demo", Some("again")).expect("recreate");
        assert_eq!(manifest.created_at, "2001-02-03");
        assert_eq!(manifest.description, "again");

        let _ = std::fs::remove_dir_all(root);
    }

    #[cfg(unix)]
    #[test]
    fn category_failure_is_not_rolled_back() {
        let root = data_root("partial");
        let store = ProjectStore::new(DataRoot::new(&root));
        std::fs::create_dir_all(root.join("demo")).expect("create project dir");
        // A plain file where a category folder belongs makes create_dir_all fail.
        std::fs::write(root.join("demo/scenes"), "blocker").expect("write blocker");

        let err = store.create("demo", None).expect_err("category creation fails");
        assert_eq!(err.status_code(), 500);
        assert!(root.join("demo/nora.json").is_file());
        assert!(root.join("demo/objects").is_dir());
        assert!(!root.join("demo/scripts").exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn files_of_missing_project_is_not_found() {
        let root = data_root("missing");
        let store = ProjectStore::new(DataRoot::new(&root));
        let err = store.files("ghost").expect_err("missing project");
        assert_eq!(err.status_code(), 404);
        let _ = std::fs::remove_dir_all(root);
    }
}
