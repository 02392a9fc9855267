//! `depwatch show` command implementation.

use super::{fail, print_json, registry_client, runtime};
use depwatch_core::manifest::{check_conformance, ConformanceFinding, PackageManifest};
use depwatch_core::pkg::{resolve_version, PackageSpec, PkgError};
use depwatch_core::Config;
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct ShowResult {
    ok: bool,
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    published_at: Option<String>,
    conforms: bool,
    /// Present when the published manifest has the expected shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<PackageManifest>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    findings: Vec<ConformanceFinding>,
}

pub fn run(config: &Config, spec: &str, json: bool) -> Result<()> {
    let rt = runtime()?;
    let result = match rt.block_on(lookup(config, spec)) {
        Ok(result) => result,
        Err(e) => return fail(&e, json),
    };

    if json {
        return print_json(&result);
    }
    print_human(&result);
    Ok(())
}

async fn lookup(config: &Config, spec: &str) -> Result<ShowResult, PkgError> {
    let spec = PackageSpec::parse(spec)?;
    let client = registry_client(config)?;
    let packument = client.fetch_packument(&spec.name).await?;
    let version = resolve_version(&packument, spec.range.as_deref())?;
    tracing::debug!(package = %spec.name, %version, "resolved");

    let raw = packument
        .versions
        .get(&version)
        .ok_or_else(|| PkgError::version_not_found(&spec.name, &version))?;

    // Old releases predate the current manifest shape; report rather than fail.
    let report = check_conformance(raw);
    let manifest = PackageManifest::from_json_value(raw.clone()).ok();

    Ok(ShowResult {
        ok: true,
        name: spec.name,
        published_at: packument.published_at(&version).map(String::from),
        version,
        conforms: report.conforms(),
        manifest,
        findings: report.findings,
    })
}

fn print_human(result: &ShowResult) {
    println!("{}@{}", result.name, result.version);

    let Some(manifest) = &result.manifest else {
        println!("  published manifest does not have the expected shape:");
        for finding in &result.findings {
            println!("  {} [{}] {}", finding.path, finding.code, finding.message);
        }
        return;
    };

    if let Some(description) = &manifest.description {
        println!("  {description}");
    }
    println!();

    let field = |label: &str, value: Option<&str>| {
        if let Some(value) = value {
            println!("  {label:<14}{value}");
        }
    };
    field("license:", manifest.license.as_deref());
    field("homepage:", manifest.homepage.as_deref());
    field(
        "repository:",
        manifest.repository.as_ref().map(|r| r.url.as_str()),
    );
    field("published:", result.published_at.as_deref());
    field(
        "publisher:",
        manifest.npm_user.as_ref().map(|u| u.name.as_str()),
    );

    let dep_count = manifest.dependencies.as_ref().map_or(0, |d| d.len());
    println!("  {:<14}{dep_count}", "dependencies:");

    if let Some(dist) = &manifest.dist {
        println!();
        println!("  dist");
        println!("    tarball:    {}", dist.tarball);
        println!("    shasum:     {}", dist.shasum);
        println!("    integrity:  {}", dist.integrity);
        if let Some(count) = dist.file_count {
            println!("    files:      {count}");
        }
        if let Some(size) = dist.unpacked_size {
            println!("    unpacked:   {size} bytes");
        }
        if let Some(signatures) = &dist.signatures {
            println!("    signatures: {}", signatures.len());
        }
    }

    if let Some(maintainers) = manifest.maintainers.as_ref().filter(|m| !m.is_empty()) {
        println!();
        println!("  maintainers");
        for m in maintainers {
            println!("    {} <{}>", m.name, m.email);
        }
    }
}
