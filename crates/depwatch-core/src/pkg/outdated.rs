//! Registry lookups for every declared dependency.

use super::project::DependencyEntry;
use super::registry::RegistryClient;
use super::version::{analyze, VersionReport};
use futures::stream::{self, StreamExt};

/// Maximum concurrent packument fetches.
pub const MAX_CONCURRENT_FETCHES: usize = 16;

/// Check each dependency against the registry.
///
/// Reports come back in input order. A failed lookup produces a report with
/// `error` set; it never fails the batch.
pub async fn check_outdated(
    registry: &RegistryClient,
    deps: &[DependencyEntry],
) -> Vec<VersionReport> {
    let reports: Vec<VersionReport> = stream::iter(deps)
        .map(|dep| {
            let registry = registry.clone();
            async move {
                match registry.fetch_packument(&dep.name).await {
                    Ok(packument) => analyze(&packument, &dep.name, &dep.range),
                    Err(e) => {
                        tracing::warn!(package = %dep.name, error = %e, "registry lookup failed");
                        VersionReport::failed(&dep.name, &dep.range, &e)
                    }
                }
            }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    let outdated = reports.iter().filter(|r| r.is_outdated()).count();
    tracing::info!(checked = reports.len(), outdated, "outdated check complete");
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;
    use axum::{
        extract::Path,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    async fn handle_packument(Path(name): Path<String>) -> Response {
        let versions = match name.as_str() {
            "lodash" => vec!["4.17.0", "4.17.20", "4.17.21"],
            "react" => vec!["17.0.2", "18.2.0"],
            "@types/node" => vec!["20.1.0", "20.1.7", "22.0.0"],
            _ => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        };
        let latest = versions[versions.len() - 1];
        let versions: serde_json::Map<String, serde_json::Value> = versions
            .iter()
            .map(|v| ((*v).to_string(), json!({ "name": name, "version": v })))
            .collect();
        Json(json!({
            "name": name,
            "dist-tags": { "latest": latest },
            "versions": versions
        }))
        .into_response()
    }

    async fn start_mock_registry() -> String {
        let app = Router::new().route("/:name", get(handle_packument));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_check_outdated_order_and_errors() {
        let base = start_mock_registry().await;
        let registry = RegistryClient::new(&base).unwrap();

        let deps = vec![
            DependencyEntry::new("react", "^17.0.2"),
            DependencyEntry::new("missing-pkg", "^1.0.0"),
            DependencyEntry::new("lodash", "~4.17.0"),
            DependencyEntry::new("@types/node", "^20.1.0"),
        ];

        let reports = check_outdated(&registry, &deps).await;
        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["react", "missing-pkg", "lodash", "@types/node"]);

        assert_eq!(reports[0].current.as_deref(), Some("17.0.2"));
        assert_eq!(reports[0].latest.as_deref(), Some("18.2.0"));
        assert!(reports[0].is_outdated());

        assert_eq!(
            reports[1].error.as_ref().map(|e| e.code.as_str()),
            Some(codes::PKG_NOT_FOUND)
        );

        assert_eq!(reports[2].latest_patch.as_deref(), Some("4.17.21"));

        assert_eq!(reports[3].latest_patch.as_deref(), Some("20.1.7"));
        assert_eq!(reports[3].latest.as_deref(), Some("22.0.0"));
    }

    #[tokio::test]
    async fn test_check_outdated_empty() {
        let registry = RegistryClient::new("http://127.0.0.1:9/").unwrap();
        assert!(check_outdated(&registry, &[]).await.is_empty());
    }
}
