//! Package error types.

use serde::Serialize;
use std::fmt;
use std::io;

/// Package error codes.
pub mod codes {
    pub const PKG_SPEC_INVALID: &str = "PKG_SPEC_INVALID";
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_VERSION_NOT_FOUND: &str = "PKG_VERSION_NOT_FOUND";
    pub const PKG_REGISTRY_ERROR: &str = "PKG_REGISTRY_ERROR";
    pub const PKG_DOWNLOAD_FAILED: &str = "PKG_DOWNLOAD_FAILED";

    // Project discovery
    pub const PKG_DIR_EMPTY: &str = "PKG_DIR_EMPTY";
    pub const PKG_DIR_UNREADABLE: &str = "PKG_DIR_UNREADABLE";
    pub const PKG_PACKAGE_JSON_NOT_FOUND: &str = "PKG_PACKAGE_JSON_NOT_FOUND";
    pub const PKG_PACKAGE_JSON_INVALID: &str = "PKG_PACKAGE_JSON_INVALID";

    pub const PKG_RANGE_INVALID: &str = "PKG_RANGE_INVALID";

    // Tarball verification
    pub const PKG_INTEGRITY_INVALID: &str = "PKG_INTEGRITY_INVALID";
    pub const PKG_INTEGRITY_MISMATCH: &str = "PKG_INTEGRITY_MISMATCH";
}

/// Package error.
#[derive(Debug, Clone)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_SPEC_INVALID, msg)
    }

    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(codes::PKG_NOT_FOUND, format!("Package not found: {name}"))
    }

    #[must_use]
    pub fn version_not_found(name: &str, range: &str) -> Self {
        Self::new(
            codes::PKG_VERSION_NOT_FOUND,
            format!("No version of {name} satisfies range: {range}"),
        )
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_ERROR, msg)
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_DOWNLOAD_FAILED, msg)
    }

    #[must_use]
    pub fn dir_empty(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_DIR_EMPTY,
            format!("Directory is empty: {}", path.display()),
        )
    }

    #[must_use]
    pub fn dir_unreadable(path: &std::path::Path, err: &io::Error) -> Self {
        Self::new(
            codes::PKG_DIR_UNREADABLE,
            format!("Cannot read directory {}: {err}", path.display()),
        )
    }

    #[must_use]
    pub fn package_json_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_PACKAGE_JSON_NOT_FOUND,
            format!("package.json not found in {}", path.display()),
        )
    }

    pub fn package_json_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_PACKAGE_JSON_INVALID, msg)
    }

    #[must_use]
    pub fn range_invalid(range: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_RANGE_INVALID,
            format!("Invalid version range '{range}': {reason}"),
        )
    }

    pub fn integrity_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_INTEGRITY_INVALID, msg)
    }

    pub fn integrity_mismatch(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_INTEGRITY_MISMATCH, msg)
    }
}

/// Serializable error payload for reports and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&PkgError> for ErrorInfo {
    fn from(e: &PkgError) -> Self {
        Self {
            code: e.code.to_string(),
            message: e.message.clone(),
        }
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::PKG_DOWNLOAD_FAILED, e.to_string())
    }
}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(codes::PKG_REGISTRY_ERROR, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(codes::PKG_REGISTRY_ERROR, format!("Connection failed: {e}"))
        } else {
            Self::new(codes::PKG_REGISTRY_ERROR, e.to_string())
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(codes::PKG_REGISTRY_ERROR, format!("Invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = PkgError::spec_invalid("bad spec");
        assert_eq!(err.code(), codes::PKG_SPEC_INVALID);
        assert!(err.to_string().starts_with("PKG_SPEC_INVALID: "));
        assert_eq!(err.message(), "bad spec");
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::PKG_SPEC_INVALID,
            codes::PKG_NOT_FOUND,
            codes::PKG_VERSION_NOT_FOUND,
            codes::PKG_REGISTRY_ERROR,
            codes::PKG_DOWNLOAD_FAILED,
            codes::PKG_DIR_EMPTY,
            codes::PKG_DIR_UNREADABLE,
            codes::PKG_PACKAGE_JSON_NOT_FOUND,
            codes::PKG_PACKAGE_JSON_INVALID,
            codes::PKG_RANGE_INVALID,
            codes::PKG_INTEGRITY_INVALID,
            codes::PKG_INTEGRITY_MISMATCH,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn test_error_info_from_pkg_error() {
        let info = ErrorInfo::from(&PkgError::not_found("left-pad"));
        assert_eq!(info.code, codes::PKG_NOT_FOUND);
        assert_eq!(info.message, "Package not found: left-pad");
    }

    #[test]
    fn test_package_json_not_found_mentions_path() {
        let err = PkgError::package_json_not_found(std::path::Path::new("/tmp/project"));
        assert_eq!(err.code(), codes::PKG_PACKAGE_JSON_NOT_FOUND);
        assert!(err.message().contains("/tmp/project"));
    }
}
