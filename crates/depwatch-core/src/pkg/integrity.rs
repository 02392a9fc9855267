//! Subresource Integrity (SRI) parsing and tarball verification.
//!
//! npm writes `dist.integrity` as one or more `<algo>-<base64 digest>` tokens
//! and `dist.shasum` as a hex SHA-1. Verification uses the strongest
//! algorithm present in the integrity string.

use super::error::PkgError;
use super::tarball::{tarball_stats, TarballStats};
use crate::manifest::Dist;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Hash algorithms recognized in integrity strings, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    #[must_use]
    pub fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(bytes).to_vec(),
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
            Self::Sha384 => Sha384::digest(bytes).to_vec(),
            Self::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<algo>-<digest>` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityHash {
    pub algorithm: Algorithm,
    pub digest: Vec<u8>,
}

impl fmt::Display for IntegrityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm, STANDARD.encode(&self.digest))
    }
}

/// A parsed integrity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    hashes: Vec<IntegrityHash>,
}

impl Integrity {
    /// Parse an SRI string. Unknown algorithms and `?options` suffixes are ignored.
    ///
    /// # Errors
    /// Returns `PKG_INTEGRITY_INVALID` when no token is usable.
    pub fn parse(sri: &str) -> Result<Self, PkgError> {
        let hashes: Vec<IntegrityHash> = sri
            .split_whitespace()
            .filter_map(|token| {
                let token = token.split('?').next().unwrap_or(token);
                let (algo, b64) = token.split_once('-')?;
                let algorithm = Algorithm::from_prefix(algo)?;
                let digest = STANDARD.decode(b64).ok()?;
                Some(IntegrityHash { algorithm, digest })
            })
            .collect();

        if hashes.is_empty() {
            return Err(PkgError::integrity_invalid(format!(
                "No supported hash in integrity string '{sri}'"
            )));
        }
        Ok(Self { hashes })
    }

    /// Build an integrity value for `bytes`.
    #[must_use]
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Self {
        Self {
            hashes: vec![IntegrityHash {
                algorithm,
                digest: algorithm.digest(bytes),
            }],
        }
    }

    /// The strongest listed hash.
    #[must_use]
    pub fn strongest(&self) -> &IntegrityHash {
        // parse() and from_bytes() never produce an empty list.
        self.hashes
            .iter()
            .max_by_key(|h| h.algorithm)
            .unwrap_or(&self.hashes[0])
    }

    /// Check `bytes` against the strongest listed hash.
    ///
    /// Tokens of the strongest algorithm are alternatives: any match passes.
    #[must_use]
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let algorithm = self.strongest().algorithm;
        let actual = algorithm.digest(bytes);
        self.hashes
            .iter()
            .filter(|h| h.algorithm == algorithm)
            .any(|h| h.digest == actual)
    }

    /// Like [`Integrity::matches`] but returns a descriptive error.
    ///
    /// # Errors
    /// Returns `PKG_INTEGRITY_MISMATCH` with expected and actual digests.
    pub fn verify(&self, bytes: &[u8]) -> Result<Algorithm, PkgError> {
        let expected = self.strongest();
        if self.matches(bytes) {
            return Ok(expected.algorithm);
        }
        let actual = IntegrityHash {
            algorithm: expected.algorithm,
            digest: expected.algorithm.digest(bytes),
        };
        Err(PkgError::integrity_mismatch(format!(
            "expected {expected}, got {actual}"
        )))
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.hashes.iter().map(ToString::to_string).collect();
        f.write_str(&tokens.join(" "))
    }
}

/// Outcome of checking downloaded bytes against `dist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistVerification {
    /// Algorithm used for the integrity check.
    pub algorithm: Option<Algorithm>,
    pub integrity_ok: bool,
    pub shasum_ok: bool,
    /// `None` when `dist.fileCount` is absent.
    pub file_count_ok: Option<bool>,
    /// `None` when `dist.unpackedSize` is absent.
    pub unpacked_size_ok: Option<bool>,
    pub stats: Option<TarballStats>,
    /// Human-readable reasons for every failed check.
    pub problems: Vec<String>,
}

impl DistVerification {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.integrity_ok
            && self.shasum_ok
            && self.file_count_ok != Some(false)
            && self.unpacked_size_ok != Some(false)
    }
}

/// Verify tarball bytes against every check `dist` makes possible.
#[must_use]
pub fn verify_dist(dist: &Dist, bytes: &[u8]) -> DistVerification {
    let mut problems = Vec::new();

    let (algorithm, integrity_ok) = match Integrity::parse(&dist.integrity) {
        Ok(integrity) => match integrity.verify(bytes) {
            Ok(algo) => (Some(algo), true),
            Err(e) => {
                problems.push(format!("integrity: {}", e.message()));
                (Some(integrity.strongest().algorithm), false)
            }
        },
        Err(e) => {
            problems.push(format!("integrity: {}", e.message()));
            (None, false)
        }
    };

    let actual_shasum = hex::encode(Sha1::digest(bytes));
    let shasum_ok = actual_shasum.eq_ignore_ascii_case(dist.shasum.trim());
    if !shasum_ok {
        problems.push(format!(
            "shasum: expected {}, got {actual_shasum}",
            dist.shasum
        ));
    }

    let stats = match tarball_stats(bytes) {
        Ok(stats) => Some(stats),
        Err(e) => {
            if dist.file_count.is_some() || dist.unpacked_size.is_some() {
                problems.push(format!("tarball: {}", e.message()));
            }
            None
        }
    };

    let file_count_ok = dist.file_count.map(|expected| {
        let actual = stats.map(|s| s.file_count);
        let ok = actual == Some(expected);
        if !ok {
            if let Some(actual) = actual {
                problems.push(format!("fileCount: expected {expected}, got {actual}"));
            }
        }
        ok
    });

    let unpacked_size_ok = dist.unpacked_size.map(|expected| {
        let actual = stats.map(|s| s.unpacked_size);
        let ok = actual == Some(expected);
        if !ok {
            if let Some(actual) = actual {
                problems.push(format!("unpackedSize: expected {expected}, got {actual}"));
            }
        }
        ok
    });

    DistVerification {
        algorithm,
        integrity_ok,
        shasum_ok,
        file_count_ok,
        unpacked_size_ok,
        stats,
        problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;
    use crate::pkg::tarball::tests::create_test_tarball;

    fn dist_for(bytes: &[u8]) -> Dist {
        Dist {
            integrity: Integrity::from_bytes(Algorithm::Sha512, bytes).to_string(),
            shasum: hex::encode(Sha1::digest(bytes)),
            tarball: "https://registry.example.com/x/-/x-1.0.0.tgz".to_string(),
            file_count: None,
            unpacked_size: None,
            attestations: None,
            signatures: None,
        }
    }

    #[test]
    fn test_parse_known_vector() {
        // sha256 of the empty string.
        let integrity =
            Integrity::parse("sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=").unwrap();
        assert!(integrity.matches(b""));
        assert!(!integrity.matches(b"x"));
    }

    #[test]
    fn test_parse_multiple_picks_strongest() {
        let bytes = b"hello";
        let sri = format!(
            "{} {}?foo",
            Integrity::from_bytes(Algorithm::Sha1, bytes),
            Integrity::from_bytes(Algorithm::Sha512, bytes)
        );
        let integrity = Integrity::parse(&sri).unwrap();
        assert_eq!(integrity.strongest().algorithm, Algorithm::Sha512);
        assert_eq!(integrity.verify(bytes).unwrap(), Algorithm::Sha512);
    }

    #[test]
    fn test_parse_skips_unknown_algorithms() {
        let sri = format!("md5-AAAA {}", Integrity::from_bytes(Algorithm::Sha256, b"a"));
        let integrity = Integrity::parse(&sri).unwrap();
        assert_eq!(integrity.strongest().algorithm, Algorithm::Sha256);
    }

    #[test]
    fn test_parse_rejects_unusable() {
        for bad in ["", "md5-AAAA", "sha512", "sha512-***"] {
            let err = Integrity::parse(bad).unwrap_err();
            assert_eq!(err.code(), codes::PKG_INTEGRITY_INVALID, "{bad}");
        }
    }

    #[test]
    fn test_verify_mismatch_message() {
        let integrity = Integrity::from_bytes(Algorithm::Sha512, b"original");
        let err = integrity.verify(b"tampered").unwrap_err();
        assert_eq!(err.code(), codes::PKG_INTEGRITY_MISMATCH);
        assert!(err.message().starts_with("expected sha512-"));
    }

    #[test]
    fn test_verify_dist_ok_with_stats() {
        let tgz = create_test_tarball(&[("package.json", b"{}"), ("index.js", b"1;")]);
        let mut dist = dist_for(&tgz);
        dist.file_count = Some(2);
        dist.unpacked_size = Some(4);

        let result = verify_dist(&dist, &tgz);
        assert!(result.ok(), "{:?}", result.problems);
        assert_eq!(result.algorithm, Some(Algorithm::Sha512));
        assert_eq!(result.file_count_ok, Some(true));
        assert_eq!(result.unpacked_size_ok, Some(true));
    }

    #[test]
    fn test_verify_dist_tampered() {
        let tgz = create_test_tarball(&[("index.js", b"1;")]);
        let dist = dist_for(&tgz);
        let other = create_test_tarball(&[("index.js", b"2;")]);

        let result = verify_dist(&dist, &other);
        assert!(!result.ok());
        assert!(!result.integrity_ok);
        assert!(!result.shasum_ok);
        assert_eq!(result.problems.len(), 2);
        assert_eq!(result.file_count_ok, None);
    }

    #[test]
    fn test_verify_dist_file_count_mismatch() {
        let tgz = create_test_tarball(&[("index.js", b"1;")]);
        let mut dist = dist_for(&tgz);
        dist.file_count = Some(3);

        let result = verify_dist(&dist, &tgz);
        assert!(result.integrity_ok && result.shasum_ok);
        assert_eq!(result.file_count_ok, Some(false));
        assert!(!result.ok());
        assert_eq!(result.problems, vec!["fileCount: expected 3, got 1".to_string()]);
    }

    #[test]
    fn test_verify_dist_shasum_case_insensitive() {
        let bytes = b"payload";
        let mut dist = dist_for(bytes);
        dist.shasum = dist.shasum.to_uppercase();
        assert!(verify_dist(&dist, bytes).shasum_ok);
    }
}
