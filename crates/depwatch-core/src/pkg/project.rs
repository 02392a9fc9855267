//! Project `package.json` discovery and dependency extraction.

use super::error::PkgError;
use crate::manifest::PackageManifest;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest.
pub const PACKAGE_JSON: &str = "package.json";

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    pub name: String,
    pub range: String,
}

impl DependencyEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }
}

/// Dependencies of a project, each list sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectDependencies {
    pub deps: Vec<DependencyEntry>,
    pub dev_deps: Vec<DependencyEntry>,
}

impl ProjectDependencies {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty() && self.dev_deps.is_empty()
    }
}

/// Find `package.json` directly inside `dir`.
///
/// # Errors
/// - `PKG_DIR_UNREADABLE` if the directory cannot be listed
/// - `PKG_DIR_EMPTY` if it has no entries
/// - `PKG_PACKAGE_JSON_NOT_FOUND` if no `package.json` file is present
pub fn find_package_json(dir: &Path) -> Result<PathBuf, PkgError> {
    let entries = fs::read_dir(dir)
        .and_then(|rd| {
            rd.map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|e| PkgError::dir_unreadable(dir, &e))?;

    if entries.is_empty() {
        return Err(PkgError::dir_empty(dir));
    }

    entries
        .into_iter()
        .find(|path| {
            path.file_name().is_some_and(|name| name == PACKAGE_JSON) && path.is_file()
        })
        .ok_or_else(|| PkgError::package_json_not_found(dir))
}

/// Resolve a user-supplied path to a manifest file: files are taken as-is,
/// directories are searched with [`find_package_json`].
///
/// # Errors
/// Same as [`find_package_json`], plus `PKG_PACKAGE_JSON_NOT_FOUND` when the
/// path does not exist.
pub fn locate_package_json(path: &Path) -> Result<PathBuf, PkgError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else if path.is_dir() {
        find_package_json(path)
    } else {
        Err(PkgError::package_json_not_found(path))
    }
}

/// Read a manifest file as untyped JSON.
///
/// # Errors
/// Returns `PKG_PACKAGE_JSON_INVALID` if the file is unreadable or not JSON.
pub fn read_manifest_value(path: &Path) -> Result<Value, PkgError> {
    let content = fs::read_to_string(path).map_err(|e| {
        PkgError::package_json_invalid(format!("Failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        PkgError::package_json_invalid(format!("Invalid JSON in {}: {e}", path.display()))
    })
}

/// Read and deserialize a manifest file.
///
/// # Errors
/// Returns `PKG_PACKAGE_JSON_INVALID` if the file is unreadable or does not
/// have the manifest shape.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, PkgError> {
    let value = read_manifest_value(path)?;
    PackageManifest::from_json_value(value)
        .map_err(|e| PkgError::package_json_invalid(format!("{}: {e}", path.display())))
}

fn sorted_entries(section: Option<&BTreeMap<String, String>>) -> Vec<DependencyEntry> {
    // BTreeMap iteration is already ordered by name.
    section
        .into_iter()
        .flatten()
        .map(|(name, range)| DependencyEntry::new(name, range))
        .collect()
}

/// Extract `dependencies` and `devDependencies`.
#[must_use]
pub fn project_dependencies(manifest: &PackageManifest) -> ProjectDependencies {
    ProjectDependencies {
        deps: sorted_entries(manifest.dependencies.as_ref()),
        dev_deps: sorted_entries(manifest.dev_dependencies.as_ref()),
    }
}
