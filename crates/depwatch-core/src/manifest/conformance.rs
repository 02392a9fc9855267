//! Structural conformance check for untyped manifest values.
//!
//! Accepts exactly the values [`PackageManifest`](super::PackageManifest)
//! deserializes, but collects every violation with a path and a stable code.
//! A `null` optional field counts as absent.

use serde::Serialize;
use serde_json::{Map, Value};

/// Conformance finding codes.
pub mod codes {
    pub const MANIFEST_NOT_OBJECT: &str = "MANIFEST_NOT_OBJECT";
    pub const MANIFEST_FIELD_MISSING: &str = "MANIFEST_FIELD_MISSING";
    pub const MANIFEST_FIELD_TYPE: &str = "MANIFEST_FIELD_TYPE";
    pub const MANIFEST_NAME_EMPTY: &str = "MANIFEST_NAME_EMPTY";
    pub const MANIFEST_REPOSITORY_SHORTHAND: &str = "MANIFEST_REPOSITORY_SHORTHAND";
}

/// A single shape violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConformanceFinding {
    /// Dotted path to the offending field, e.g. `maintainers[1].email`.
    pub path: String,
    pub code: &'static str,
    pub message: String,
}

/// Result of checking a value against the manifest shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConformanceReport {
    pub findings: Vec<ConformanceFinding>,
}

impl ConformanceReport {
    #[must_use]
    pub fn conforms(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings carrying the given code.
    pub fn with_code<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = &'a ConformanceFinding> + 'a {
        self.findings.iter().filter(move |f| f.code == code)
    }

    fn push(&mut self, path: impl Into<String>, code: &'static str, message: impl Into<String>) {
        self.findings.push(ConformanceFinding {
            path: path.into(),
            code,
            message: message.into(),
        });
    }
}

/// JSON kinds the schema distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Bool,
    Count,
    Object,
    Array,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Count => value.as_u64().is_some(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Bool => "boolean",
            Self::Count => "non-negative integer",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Human-readable type name for a JSON value.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const OPTIONAL_TEXT: &[&str] = &[
    "description",
    "license",
    "type",
    "types",
    "module",
    "main",
    "homepage",
    "_id",
    "_integrity",
    "_resolved",
    "_from",
    "_nodeVersion",
    "_npmVersion",
];

const OPTIONAL_OPEN_OBJECTS: &[&str] = &["exports", "imports", "directories", "_npmOperationalInternal"];

const OPTIONAL_TEXT_MAPS: &[&str] = &["engines", "dependencies", "devDependencies", "scripts"];

/// Check an untyped value against the manifest shape.
#[must_use]
pub fn check_conformance(value: &Value) -> ConformanceReport {
    let mut report = ConformanceReport::default();

    let Some(root) = value.as_object() else {
        report.push(
            "",
            codes::MANIFEST_NOT_OBJECT,
            format!("manifest must be an object, got {}", json_type_name(value)),
        );
        return report;
    };

    if let Some(name) = required(root, "", "name", Kind::Text, &mut report) {
        if name.as_str() == Some("") {
            report.push("name", codes::MANIFEST_NAME_EMPTY, "name must not be empty");
        }
    }
    required(root, "", "version", Kind::Text, &mut report);

    for field in OPTIONAL_TEXT {
        optional(root, "", field, Kind::Text, &mut report);
    }
    for field in OPTIONAL_OPEN_OBJECTS {
        optional(root, "", field, Kind::Object, &mut report);
    }
    for field in OPTIONAL_TEXT_MAPS {
        if let Some(map) = optional(root, "", field, Kind::Object, &mut report) {
            check_text_values(map, field, &mut report);
        }
    }
    optional(root, "", "_hasShrinkwrap", Kind::Bool, &mut report);

    if let Some(keywords) = optional(root, "", "keywords", Kind::Array, &mut report) {
        check_text_items(keywords, "keywords", &mut report);
    }

    check_repository(root, &mut report);

    if let Some(bugs) = optional(root, "", "bugs", Kind::Object, &mut report) {
        if let Some(bugs) = bugs.as_object() {
            required(bugs, "bugs", "url", Kind::Text, &mut report);
        }
    }

    if let Some(dist) = optional(root, "", "dist", Kind::Object, &mut report) {
        if let Some(dist) = dist.as_object() {
            check_dist(dist, &mut report);
        }
    }

    if let Some(user) = optional(root, "", "_npmUser", Kind::Object, &mut report) {
        if let Some(user) = user.as_object() {
            required(user, "_npmUser", "name", Kind::Text, &mut report);
            required(user, "_npmUser", "email", Kind::Text, &mut report);
            if let Some(actor) = optional(user, "_npmUser", "actor", Kind::Object, &mut report) {
                if let Some(actor) = actor.as_object() {
                    for field in ["name", "email", "type"] {
                        required(actor, "_npmUser.actor", field, Kind::Text, &mut report);
                    }
                }
            }
        }
    }

    if let Some(maintainers) = optional(root, "", "maintainers", Kind::Array, &mut report) {
        for (i, entry) in maintainers.as_array().into_iter().flatten().enumerate() {
            let path = format!("maintainers[{i}]");
            match entry.as_object() {
                Some(obj) => {
                    required(obj, &path, "name", Kind::Text, &mut report);
                    required(obj, &path, "email", Kind::Text, &mut report);
                }
                None => type_mismatch(&path, Kind::Object, entry, &mut report),
            }
        }
    }

    report
}

fn check_repository(root: &Map<String, Value>, report: &mut ConformanceReport) {
    match root.get("repository") {
        None | Some(Value::Null) => {}
        Some(Value::String(shorthand)) => report.push(
            "repository",
            codes::MANIFEST_REPOSITORY_SHORTHAND,
            format!(
                "repository shorthand '{shorthand}' is not supported; use {{ \"type\", \"url\" }}"
            ),
        ),
        Some(Value::Object(repo)) => {
            required(repo, "repository", "type", Kind::Text, report);
            required(repo, "repository", "url", Kind::Text, report);
            optional(repo, "repository", "directory", Kind::Text, report);
        }
        Some(other) => type_mismatch("repository", Kind::Object, other, report),
    }
}

fn check_dist(dist: &Map<String, Value>, report: &mut ConformanceReport) {
    for field in ["integrity", "shasum", "tarball"] {
        required(dist, "dist", field, Kind::Text, report);
    }
    optional(dist, "dist", "fileCount", Kind::Count, report);
    optional(dist, "dist", "unpackedSize", Kind::Count, report);
    optional(dist, "dist", "attestations", Kind::Object, report);
    if let Some(signatures) = optional(dist, "dist", "signatures", Kind::Array, report) {
        for (i, sig) in signatures.as_array().into_iter().flatten().enumerate() {
            if !sig.is_object() {
                type_mismatch(&format!("dist.signatures[{i}]"), Kind::Object, sig, report);
            }
        }
    }
}

fn check_text_values(map: &Value, parent: &str, report: &mut ConformanceReport) {
    for (key, value) in map.as_object().into_iter().flatten() {
        if !value.is_string() {
            type_mismatch(&format!("{parent}.{key}"), Kind::Text, value, report);
        }
    }
}

fn check_text_items(list: &Value, parent: &str, report: &mut ConformanceReport) {
    for (i, item) in list.as_array().into_iter().flatten().enumerate() {
        if !item.is_string() {
            type_mismatch(&format!("{parent}[{i}]"), Kind::Text, item, report);
        }
    }
}

fn join(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

fn type_mismatch(path: &str, expected: Kind, actual: &Value, report: &mut ConformanceReport) {
    report.push(
        path,
        codes::MANIFEST_FIELD_TYPE,
        format!("expected {}, got {}", expected.describe(), json_type_name(actual)),
    );
}

/// Require `field`; returns the value only when it has the expected kind.
fn required<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    field: &str,
    kind: Kind,
    report: &mut ConformanceReport,
) -> Option<&'a Value> {
    let path = join(parent, field);
    match obj.get(field) {
        None => {
            report.push(
                path,
                codes::MANIFEST_FIELD_MISSING,
                format!("missing required field '{field}'"),
            );
            None
        }
        Some(value) if kind.matches(value) => Some(value),
        Some(value) => {
            type_mismatch(&path, kind, value, report);
            None
        }
    }
}

/// Check an optional `field`; returns the value when present with the expected kind.
fn optional<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    field: &str,
    kind: Kind,
    report: &mut ConformanceReport,
) -> Option<&'a Value> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(value) if kind.matches(value) => Some(value),
        Some(value) => {
            type_mismatch(&join(parent, field), kind, value, report);
            None
        }
    }
}
