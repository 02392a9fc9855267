//! `depwatch verify` command implementation.

use super::{fail, print_json, registry_client, runtime};
use depwatch_core::pkg::{
    download_tarball, resolve_version, verify_dist, DistVerification, PackageSpec, PkgError,
    MAX_TARBALL_SIZE,
};
use depwatch_core::Config;
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VerifyResult {
    ok: bool,
    name: String,
    version: String,
    tarball: String,
    size: u64,
    verification: DistVerification,
}

/// Download the tarball for `spec` and check it against its `dist` entry.
///
/// Exits with status 1 when any check fails.
pub fn run(config: &Config, spec: &str, json: bool) -> Result<()> {
    let rt = runtime()?;
    let result = match rt.block_on(download_and_verify(config, spec)) {
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

async fn download_and_verify(config: &Config, spec: &str) -> Result<VerifyResult, PkgError> {
    let spec = PackageSpec::parse(spec)?;
    let client = registry_client(config)?;
    let packument = client.fetch_packument(&spec.name).await?;
    let version = resolve_version(&packument, spec.range.as_deref())?;

    // Only `dist` is needed; the rest of an older manifest may not parse.
    let dist = packument
        .dist(&version)
        .ok_or_else(|| {
            PkgError::registry(format!("{}@{version} has no dist entry", spec.name))
        })?
        .map_err(|e| PkgError::registry(format!("{}@{version} dist: {e}", spec.name)))?;
    tracing::debug!(%spec, %version, tarball = %dist.tarball, "downloading");

    let bytes = download_tarball(client.http(), &dist.tarball, MAX_TARBALL_SIZE).await?;
    let verification = verify_dist(&dist, &bytes);
    tracing::info!(
        package = %spec.name,
        %version,
        ok = verification.ok(),
        "tarball verified"
    );

    Ok(VerifyResult {
        ok: verification.ok(),
        name: spec.name,
        version,
        tarball: dist.tarball,
        size: bytes.len() as u64,
        verification,
    })
}

fn print_human(result: &VerifyResult) {
    let v = &result.verification;
    let mark = |ok: bool| if ok { "✓" } else { "✗" };

    println!("{}@{} ({} bytes)", result.name, result.version, result.size);
    match v.algorithm {
        Some(algo) => println!("  {} integrity ({algo})", mark(v.integrity_ok)),
        None => println!("  {} integrity", mark(v.integrity_ok)),
    }
    println!("  {} shasum", mark(v.shasum_ok));
    if let Some(ok) = v.file_count_ok {
        println!("  {} fileCount", mark(ok));
    }
    if let Some(ok) = v.unpacked_size_ok {
        println!("  {} unpackedSize", mark(ok));
    }

    for problem in &v.problems {
        println!("  ! {problem}");
    }
}
