//! Recursive file/folder listing of a project's category folders.

#![allow(missing_docs)]

use std::path::Path;

use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    /// Category the node lives under, identical at every depth.
    pub top_parent: String,
    pub is_folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Response body of "get project files"; field order is the category order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFiles {
    pub objects: Vec<TreeNode>,
    pub scenes: Vec<TreeNode>,
    pub scripts: Vec<TreeNode>,
    pub reports: Vec<TreeNode>,
}

pub fn project_files(project_dir: &Path) -> Result<ProjectFiles, ApiError> {
    let category = |name: &str| {
        serialize_category(project_dir, name)
            .map_err(|err| ApiError::internal(format!("Failed to open '{name}' directory"), &err))
    };
    Ok(ProjectFiles {
        objects: category("objects")?,
        scenes: category("scenes")?,
        scripts: category("scripts")?,
        reports: category("reports")?,
    })
}

/// Walks `<project_dir>/<category>` and returns its nodes sorted by name.
pub fn serialize_category(project_dir: &Path, category: &str) -> std::io::Result<Vec<TreeNode>> {
    walk(&project_dir.join(category), category)
}

fn walk(dir: &Path, top_parent: &str) -> std::io::Result<Vec<TreeNode>> {
    let mut entries = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        // file_type does not follow symlinks, so linked folders are leaves.
        let is_folder = entry.file_type()?.is_dir();
        let children = if is_folder {
            Some(walk(&entry.path(), top_parent)?)
        } else {
            None
        };
        nodes.push(TreeNode {
            name: entry.file_name().to_string_lossy().into_owned(),
            top_parent: top_parent.to_string(),
            is_folder,
            children,
        });
    }
    Ok(nodes)
}
