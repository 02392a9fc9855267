//! `depwatch outdated` command implementation.

use super::{fail, print_json, registry_client, runtime};
use depwatch_core::pkg::{
    check_outdated, find_package_json, project_dependencies, read_manifest, DependencyEntry,
    PkgError, RegistryClient, VersionReport,
};
use depwatch_core::Config;
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct OutdatedResult {
    ok: bool,
    checked: usize,
    outdated: usize,
    packages: Vec<VersionReport>,
}

/// Compare every declared dependency with the registry.
///
/// Exits with status 1 when any registry lookup failed. Outdated packages
/// alone are not a failure.
pub fn run(config: &Config, include_dev: bool, json: bool) -> Result<()> {
    let (client, entries) = match prepare(config, include_dev) {
        Ok(prepared) => prepared,
        Err(e) => return fail(&e, json),
    };

    let rt = runtime()?;
    let packages = rt.block_on(check_outdated(&client, &entries));

    let result = OutdatedResult {
        ok: packages.iter().all(|r| r.error.is_none()),
        checked: packages.len(),
        outdated: packages.iter().filter(|r| r.is_outdated()).count(),
        packages,
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

fn prepare(
    config: &Config,
    include_dev: bool,
) -> Result<(RegistryClient, Vec<DependencyEntry>), PkgError> {
    let path = find_package_json(&config.cwd)?;
    let manifest = read_manifest(&path)?;
    let deps = project_dependencies(&manifest);

    let mut entries = deps.deps;
    if include_dev {
        entries.extend(deps.dev_deps);
    }
    tracing::debug!(count = entries.len(), include_dev, "dependencies collected");

    Ok((registry_client(config)?, entries))
}

fn print_human(result: &OutdatedResult) {
    if result.packages.is_empty() {
        println!("No dependencies to check");
        return;
    }

    let name_width = result
        .packages
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("Package".len());

    println!(
        "{:<name_width$}  {:<12}  {:<12}  {:<12}  {:<12}",
        "Package", "Range", "Current", "Latest patch", "Latest"
    );
    for report in &result.packages {
        if let Some(err) = &report.error {
            println!(
                "{:<name_width$}  {:<12}  ! {}: {}",
                report.name, report.range, err.code, err.message
            );
            continue;
        }
        let marker = if report.is_outdated() { "*" } else { "" };
        println!(
            "{:<name_width$}  {:<12}  {:<12}  {:<12}  {}{marker}",
            report.name,
            report.range,
            report.current.as_deref().unwrap_or("-"),
            report.latest_patch.as_deref().unwrap_or("-"),
            report.latest.as_deref().unwrap_or("-"),
        );
    }

    println!();
    println!("{} checked, {} outdated", result.checked, result.outdated);
}
