//! `name@range` argument parsing for the `show` and `verify` commands.
//!
//! Accepts `lodash`, `lodash@4.17.21`, `lodash@^4`, `@types/node` and
//! `@types/node@^20`. A missing range means the `latest` dist-tag.

use super::error::PkgError;
use std::fmt;

/// A parsed package argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (`@scope/name` or `name`).
    pub name: String,
    /// Version range, exact version or dist-tag.
    pub range: Option<String>,
}

impl PackageSpec {
    /// Parse a package argument.
    ///
    /// # Errors
    /// Returns `PKG_SPEC_INVALID` for empty names, empty ranges, malformed
    /// scopes or characters npm does not allow in names.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        // The scope's leading '@' is not a range separator.
        let search_from = usize::from(input.starts_with('@'));
        let (name, range) = match input[search_from..].find('@') {
            Some(pos) => {
                let at = pos + search_from;
                (&input[..at], Some(&input[at + 1..]))
            }
            None => (input, None),
        };

        if let Some(range) = range {
            if range.trim().is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Empty version range in '{input}'"
                )));
            }
        }

        validate_name(name, input)?;

        Ok(Self {
            name: name.to_string(),
            range: range.map(|r| r.trim().to_string()),
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}@{range}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn validate_name(name: &str, input: &str) -> Result<(), PkgError> {
    let bare = if let Some(scoped) = name.strip_prefix('@') {
        let Some((scope, bare)) = scoped.split_once('/') else {
            return Err(PkgError::spec_invalid(format!(
                "Scoped package is missing '/' in '{input}'"
            )));
        };
        if scope.is_empty() {
            return Err(PkgError::spec_invalid(format!("Empty scope in '{input}'")));
        }
        check_chars(scope, input)?;
        bare
    } else {
        name
    };

    if bare.is_empty() {
        return Err(PkgError::spec_invalid(format!("Empty package name in '{input}'")));
    }
    check_chars(bare, input)
}

fn check_chars(part: &str, input: &str) -> Result<(), PkgError> {
    match part
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
    {
        Some(c) => Err(PkgError::spec_invalid(format!(
            "Invalid character '{c}' in '{input}'"
        ))),
        None => Ok(()),
    }
}
