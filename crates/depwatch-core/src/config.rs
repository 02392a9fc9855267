use crate::error::Error;
use crate::pkg::registry::{DEFAULT_REGISTRY, REGISTRY_ENV};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Runtime configuration for the depwatch CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Registry URL given on the command line. Takes precedence over
    /// `DEPWATCH_NPM_REGISTRY`.
    pub registry: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            registry: None,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set an explicit registry URL.
    #[must_use]
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    /// Ensure the working directory exists.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cwd.is_dir() {
            Ok(())
        } else {
            Err(Error::CwdNotFound {
                path: self.cwd.clone(),
            })
        }
    }

    /// Resolve the registry URL: command line, then environment, then the
    /// public npm registry. A trailing slash is added so package names join
    /// under the base path.
    pub fn registry_url(&self) -> Result<Url, Error> {
        let raw = self
            .registry
            .clone()
            .or_else(|| std::env::var(REGISTRY_ENV).ok())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        let normalized = if raw.ends_with('/') {
            raw
        } else {
            format!("{raw}/")
        };

        Url::parse(&normalized).map_err(|source| Error::RegistryUrl {
            url: normalized,
            source,
        })
    }
}
