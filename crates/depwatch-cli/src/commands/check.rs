//! `depwatch check` command implementation.

use super::{fail, print_json};
use depwatch_core::manifest::{check_conformance, ConformanceFinding, PackageManifest};
use depwatch_core::pkg::{locate_package_json, read_manifest_value, PkgError};
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct CheckResult {
    ok: bool,
    path: PathBuf,
    /// `name@version` when the manifest conforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    findings: Vec<ConformanceFinding>,
}

/// Check a manifest file, or the `package.json` inside a directory.
///
/// Exits with status 1 when the manifest does not conform.
pub fn run(cwd: &Path, path: Option<&Path>, json: bool) -> Result<()> {
    let target = path.map_or_else(|| cwd.to_path_buf(), |p| cwd.join(p));

    let result = match check(&target) {
        Ok(result) => result,
        Err(e) => return fail(&e, json),
    };

    if json {
        print_json(&result)?;
    } else {
        print_human(&result);
    }

    if !result.ok {
        std::process::exit(1);
    }
    Ok(())
}

fn check(target: &Path) -> Result<CheckResult, PkgError> {
    let path = locate_package_json(target)?;
    let value = read_manifest_value(&path)?;
    let report = check_conformance(&value);
    tracing::debug!(path = %path.display(), findings = report.findings.len(), "conformance checked");

    let id = if report.conforms() {
        PackageManifest::from_json_value(value)
            .ok()
            .map(|m| m.id_string())
    } else {
        None
    };

    Ok(CheckResult {
        ok: report.conforms(),
        path,
        id,
        findings: report.findings,
    })
}

fn print_human(result: &CheckResult) {
    if result.ok {
        println!(
            "✓ {} conforms ({})",
            result.id.as_deref().unwrap_or("manifest"),
            result.path.display()
        );
        return;
    }

    println!(
        "✗ {} does not conform ({} finding{})",
        result.path.display(),
        result.findings.len(),
        if result.findings.len() == 1 { "" } else { "s" }
    );
    for finding in &result.findings {
        let path = if finding.path.is_empty() {
            "<root>"
        } else {
            finding.path.as_str()
        };
        println!("  {path} [{}] {}", finding.code, finding.message);
    }
}
