pub mod check;
pub mod deps;
pub mod outdated;
pub mod show;
pub mod verify;
pub mod version;

use depwatch_core::pkg::{ErrorInfo, PkgError, RegistryClient};
use depwatch_core::Config;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

/// Failure document for `--json` mode.
#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: ErrorInfo,
}

/// Print one pretty JSON document to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Report `err` in the requested format and exit with status 1.
pub fn fail(err: &PkgError, json: bool) -> Result<()> {
    if json {
        print_json(&ErrorResult {
            ok: false,
            error: err.into(),
        })?;
    } else {
        eprintln!("error: {err}");
    }
    std::process::exit(1);
}

/// Registry client for the URL configured on the command line or in the
/// environment.
pub fn registry_client(config: &Config) -> Result<RegistryClient, PkgError> {
    let url = config
        .registry_url()
        .map_err(|e| PkgError::registry(e.to_string()))?;
    tracing::debug!(registry = %url, "using registry");
    RegistryClient::from_url(url)
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().into_diagnostic()
}
