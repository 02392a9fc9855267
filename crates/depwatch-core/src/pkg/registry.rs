//! npm registry client.

use super::error::PkgError;
use crate::manifest::{Dist, ManifestError, PackageManifest};
use crate::version::user_agent;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "DEPWATCH_NPM_REGISTRY";

/// Registry document describing every published version of a package.
///
/// Version entries are kept as raw JSON. Old releases often predate the
/// manifest shape (string `repository`, string `maintainers`), so they are
/// only parsed into [`PackageManifest`] on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packument {
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub time: BTreeMap<String, String>,
}

impl Packument {
    /// Version tagged `latest`.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    #[must_use]
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.contains_key(version)
    }

    /// Parse the manifest of one published version.
    ///
    /// Returns `None` when the version is not published.
    #[must_use]
    pub fn manifest(&self, version: &str) -> Option<Result<PackageManifest, ManifestError>> {
        self.versions
            .get(version)
            .map(|raw| PackageManifest::from_json_value(raw.clone()))
    }

    /// The `dist` entry of one published version, parsed on its own.
    ///
    /// Works for releases whose other fields fall outside the manifest shape
    /// (a string `exports`, a shorthand `repository`). Returns `None` when the
    /// version is not published or has no `dist`.
    #[must_use]
    pub fn dist(&self, version: &str) -> Option<Result<Dist, ManifestError>> {
        let raw = self.versions.get(version)?.get("dist")?;
        Some(serde_json::from_value(raw.clone()).map_err(ManifestError::from))
    }

    /// Publish timestamp for a version.
    #[must_use]
    pub fn published_at(&self, version: &str) -> Option<&str> {
        self.time.get(version).map(String::as_str)
    }
}

/// Registry client for fetching package metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;
        Self::from_url(base_url)
    }

    /// Create a client from an already parsed URL.
    ///
    /// The base path gets a trailing slash so registries mounted under a
    /// sub-path (`https://host/npm`) keep that path when names are joined.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_url(mut base_url: Url) -> Result<Self, PkgError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(user_agent())
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// URL of the packument for `name`. Scoped names have their `/` encoded.
    ///
    /// # Errors
    /// Returns an error if the name cannot be joined onto the base URL.
    pub fn packument_url(&self, name: &str) -> Result<Url, PkgError> {
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        self.base_url
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))
    }

    /// Fetch the packument (package metadata) for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails or the package is not found.
    pub async fn fetch_packument(&self, name: &str) -> Result<Packument, PkgError> {
        let url = self.packument_url(name)?;
        tracing::debug!(package = name, url = %url, "fetching packument");

        let response = self
            .http
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        let packument: Packument = serde_json::from_slice(&body)?;
        tracing::trace!(
            package = name,
            versions = packument.versions.len(),
            "packument parsed"
        );
        Ok(packument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn sample() -> Packument {
        serde_json::from_value(json!({
            "name": "react",
            "dist-tags": { "latest": "18.2.0", "next": "19.0.0-rc.0" },
            "versions": {
                "18.2.0": {
                    "name": "react",
                    "version": "18.2.0",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/react/-/react-18.2.0.tgz",
                        "shasum": "abc123",
                        "integrity": "sha512-AAAA"
                    }
                },
                "0.0.1": {
                    "name": "react",
                    "version": "0.0.1",
                    "repository": "git://github.com/facebook/react"
                }
            },
            "time": { "18.2.0": "2022-06-14T19:46:38.369Z" }
        }))
        .unwrap()
    }

    #[test]
    fn test_latest() {
        assert_eq!(sample().latest(), Some("18.2.0"));
    }

    #[test]
    fn test_dist_parsed_alone() {
        let p = sample();
        let dist = p.dist("18.2.0").unwrap().unwrap();
        assert_eq!(
            dist.tarball,
            "https://registry.npmjs.org/react/-/react-18.2.0.tgz"
        );
        assert!(p.dist("0.0.1").is_none());
        assert!(p.dist("17.0.0").is_none());
        assert!(p.has_version("0.0.1"));
    }

    #[test]
    fn test_dist_ignores_unmodeled_fields() {
        let p: Packument = serde_json::from_value(json!({
            "name": "esm-only",
            "dist-tags": { "latest": "1.0.0" },
            "versions": {
                "1.0.0": {
                    "name": "esm-only",
                    "version": "1.0.0",
                    "exports": "./index.js",
                    "dist": {
                        "tarball": "http://x/esm-only-1.0.0.tgz",
                        "shasum": "abc",
                        "integrity": "sha512-AAAA"
                    }
                }
            }
        }))
        .unwrap();

        assert!(p.manifest("1.0.0").unwrap().is_err());
        let dist = p.dist("1.0.0").unwrap().unwrap();
        assert_eq!(dist.tarball, "http://x/esm-only-1.0.0.tgz");
    }

    #[test]
    fn test_dist_wrong_shape() {
        let p: Packument = serde_json::from_value(json!({
            "name": "odd",
            "versions": { "1.0.0": { "name": "odd", "version": "1.0.0", "dist": { "tarball": 1 } } }
        }))
        .unwrap();
        assert!(p.dist("1.0.0").unwrap().is_err());
    }

    #[test]
    fn test_manifest_parsed_lazily() {
        let p = sample();
        let current = p.manifest("18.2.0").unwrap().unwrap();
        assert_eq!(current.dist.unwrap().shasum, "abc123");

        // Legacy entry with shorthand repository does not break the packument.
        assert!(p.manifest("0.0.1").unwrap().is_err());
        assert!(p.manifest("9.9.9").is_none());
    }

    #[test]
    fn test_published_at() {
        assert_eq!(
            sample().published_at("18.2.0"),
            Some("2022-06-14T19:46:38.369Z")
        );
    }

    #[test]
    fn test_packument_without_tags() {
        let p: Packument = serde_json::from_value(json!({ "name": "ghost" })).unwrap();
        assert!(p.latest().is_none());
        assert!(p.versions.is_empty());
    }

    #[test]
    fn test_packument_url_scoped() {
        let client = RegistryClient::new(DEFAULT_REGISTRY).unwrap();
        assert_eq!(
            client.packument_url("@types/node").unwrap().as_str(),
            "https://registry.npmjs.org/@types%2Fnode"
        );
        assert_eq!(
            client.packument_url("lodash").unwrap().as_str(),
            "https://registry.npmjs.org/lodash"
        );
    }

    #[test]
    fn test_packument_url_keeps_sub_path() {
        let client = RegistryClient::new("http://127.0.0.1:4873/npm").unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:4873/npm/");
        assert_eq!(
            client.packument_url("lodash").unwrap().as_str(),
            "http://127.0.0.1:4873/npm/lodash"
        );
        assert_eq!(
            client.packument_url("@types/node").unwrap().as_str(),
            "http://127.0.0.1:4873/npm/@types%2Fnode"
        );
    }

    #[test]
    #[serial]
    fn test_from_env_sub_path() {
        std::env::set_var(REGISTRY_ENV, "https://mirror.example.com/registry/npm");
        let client = RegistryClient::from_env();
        std::env::remove_var(REGISTRY_ENV);

        assert_eq!(
            client.unwrap().packument_url("react").unwrap().as_str(),
            "https://mirror.example.com/registry/npm/react"
        );
    }

    #[test]
    #[serial]
    fn test_from_env_default() {
        std::env::remove_var(REGISTRY_ENV);
        let client = RegistryClient::from_env().unwrap();
        assert_eq!(client.base_url().as_str(), DEFAULT_REGISTRY);
    }

    #[test]
    fn test_client_invalid_url() {
        let client = RegistryClient::new("not-a-url");
        assert!(client.is_err());
    }
}
