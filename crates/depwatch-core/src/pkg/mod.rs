//! Package registry functionality.
//!
//! Provides utilities for:
//! - Parsing package specifications (name@range)
//! - Locating and reading a project's package.json
//! - Fetching packuments from an npm registry
//! - Translating npm ranges to semver and resolving them
//! - Reporting outdated dependencies
//! - Downloading tarballs and verifying them against `dist`

pub mod error;
pub mod integrity;
pub mod outdated;
pub mod project;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod version;

pub use error::{codes as pkg_codes, ErrorInfo, PkgError};
pub use integrity::{verify_dist, Algorithm, DistVerification, Integrity, IntegrityHash};
pub use outdated::{check_outdated, MAX_CONCURRENT_FETCHES};
pub use project::{
    find_package_json, locate_package_json, project_dependencies, read_manifest,
    read_manifest_value, DependencyEntry, ProjectDependencies, PACKAGE_JSON,
};
pub use registry::{Packument, RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use spec::PackageSpec;
pub use tarball::{download_tarball, tarball_stats, TarballStats, MAX_TARBALL_SIZE};
pub use version::{analyze, base_version, parse_range, resolve_version, NpmRange, VersionReport};
