//! `depwatch deps` command implementation.

use super::{fail, print_json};
use depwatch_core::pkg::{
    find_package_json, project_dependencies, read_manifest, DependencyEntry, PkgError,
    ProjectDependencies,
};
use miette::Result;
use serde::Serialize;
use std::path::Path;

/// Which dependency sections to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsFilter {
    All,
    ProdOnly,
    DevOnly,
}

#[derive(Serialize)]
struct DepsResult {
    ok: bool,
    name: String,
    version: String,
    dependencies: Vec<DependencyEntry>,
    dev_dependencies: Vec<DependencyEntry>,
}

pub fn run(cwd: &Path, filter: DepsFilter, json: bool) -> Result<()> {
    let result = match load(cwd, filter) {
        Ok(result) => result,
        Err(e) => return fail(&e, json),
    };

    if json {
        return print_json(&result);
    }

    println!("{}@{}", result.name, result.version);
    if filter != DepsFilter::DevOnly {
        print_section("dependencies", &result.dependencies);
    }
    if filter != DepsFilter::ProdOnly {
        print_section("devDependencies", &result.dev_dependencies);
    }
    Ok(())
}

fn load(cwd: &Path, filter: DepsFilter) -> Result<DepsResult, PkgError> {
    let path = find_package_json(cwd)?;
    let manifest = read_manifest(&path)?;
    let ProjectDependencies { deps, dev_deps } = project_dependencies(&manifest);

    let (dependencies, dev_dependencies) = match filter {
        DepsFilter::All => (deps, dev_deps),
        DepsFilter::ProdOnly => (deps, Vec::new()),
        DepsFilter::DevOnly => (Vec::new(), dev_deps),
    };

    Ok(DepsResult {
        ok: true,
        name: manifest.name,
        version: manifest.version,
        dependencies,
        dev_dependencies,
    })
}

fn print_section(title: &str, entries: &[DependencyEntry]) {
    println!();
    println!("{title} ({}):", entries.len());
    if entries.is_empty() {
        println!("  (none)");
    }
    for entry in entries {
        println!("  {} {}", entry.name, entry.range);
    }
}
