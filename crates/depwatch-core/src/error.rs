use std::path::PathBuf;
use thiserror::Error;

/// Core error type for depwatch configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid registry URL '{url}': {source}")]
    RegistryUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Working directory not found: {}", path.display())]
    CwdNotFound { path: PathBuf },
}
