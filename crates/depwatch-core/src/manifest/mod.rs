//! npm package manifest (`package.json`) schema.
//!
//! Plain records mirroring the manifest format as published by npm, including
//! the registry-populated `_`-prefixed fields. Nothing here checks semantics:
//! `version` is any text, URLs are not resolved and integrity strings are
//! not decoded. Acceptance is purely structural, either through serde
//! deserialization or through [`check_conformance`], which reports every
//! violation instead of the first.
//!
//! `repository` is modeled only in its object form `{ "type", "url" }`. The
//! string shorthand (`"github:user/repo"`) is rejected by deserialization and
//! flagged with its own code by the conformance check.

pub mod conformance;

pub use conformance::{check_conformance, codes, ConformanceFinding, ConformanceReport};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Open-ended JSON object used for sub-formats the schema does not model.
pub type JsonObject = serde_json::Map<String, Value>;

/// Errors from typed manifest parsing.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Invalid package manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Root manifest record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(deserialize_with = "non_empty_string")]
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Module system marker (`"module"` or `"commonjs"`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<JsonObject>,
    /// Engine name to version range, e.g. `node` -> `>=18`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bugs: Option<Bugs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,

    // Registry-populated fields.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_integrity", default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(rename = "_resolved", default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(rename = "_from", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "_nodeVersion", default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    #[serde(rename = "_npmVersion", default, skip_serializing_if = "Option::is_none")]
    pub npm_version: Option<String>,
    #[serde(
        rename = "_npmOperationalInternal",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub npm_operational_internal: Option<JsonObject>,
    #[serde(rename = "_hasShrinkwrap", default, skip_serializing_if = "Option::is_none")]
    pub has_shrinkwrap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<Dist>,
    #[serde(rename = "_npmUser", default, skip_serializing_if = "Option::is_none")]
    pub npm_user: Option<NpmUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainers: Option<Vec<Maintainer>>,
}

/// Version control location of the package source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// VCS identifier, usually `git`.
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: String,
    /// Subdirectory for packages living in a monorepo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bugs {
    pub url: String,
}

/// Distribution metadata written by the registry at publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dist {
    /// Subresource integrity string, e.g. `sha512-...`.
    pub integrity: String,
    /// Hex SHA-1 of the tarball.
    pub shasum: String,
    pub tarball: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpacked_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestations: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<Vec<JsonObject>>,
}

/// Account that published a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpmUser {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
}

/// Identity acting on behalf of the publisher (human or automation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub actor_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    pub email: String,
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&s),
            &"a non-empty package name",
        ));
    }
    Ok(s)
}

impl PackageManifest {
    /// Smallest conforming manifest.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_value(value: Value) -> Result<Self, ManifestError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `name@version`.
    #[must_use]
    pub fn id_string(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}
