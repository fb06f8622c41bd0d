//! Fetcher dispatch for boundary sources.
//!
//! Each fetcher returns raw `GeoJSON` features as `serde_json::Value`s;
//! [`crate::normalize`] turns them into boundary records.

pub mod arcgis;
pub mod collection;

use covid_map_geography_models::{BoundaryFetcherConfig, BoundarySource};

use crate::GeoError;

/// Fetches every feature a source provides.
///
/// # Errors
///
/// Returns [`GeoError`] if the request or response parsing fails.
pub async fn fetch_features(
    client: &reqwest::Client,
    source: &BoundarySource,
) -> Result<Vec<serde_json::Value>, GeoError> {
    match &source.fetcher {
        BoundaryFetcherConfig::Arcgis { url, max_records } => {
            arcgis::fetch(client, url, "1=1", *max_records).await
        }
        BoundaryFetcherConfig::GeojsonUrl { url } => collection::fetch(client, url).await,
        BoundaryFetcherConfig::GeojsonFile { path } => collection::fetch(client, path).await,
    }
}

/// Fetches the features of `source` whose code property contains `code`.
///
/// `ArcGIS` sources filter server-side; `GeoJSON` sources are fetched in
/// full and filtered here.
///
/// # Errors
///
/// Returns [`GeoError`] if the request or response parsing fails.
pub async fn fetch_features_for_code(
    client: &reqwest::Client,
    source: &BoundarySource,
    code: &str,
) -> Result<Vec<serde_json::Value>, GeoError> {
    match &source.fetcher {
        BoundaryFetcherConfig::Arcgis { url, max_records } => {
            let where_clause = format!(
                "UPPER({}) like '%{}%'",
                source.fields.code,
                code.to_uppercase().replace('\'', "''")
            );
            arcgis::fetch(client, url, &where_clause, *max_records).await
        }
        BoundaryFetcherConfig::GeojsonUrl { .. } | BoundaryFetcherConfig::GeojsonFile { .. } => {
            let features = fetch_features(client, source).await?;
            Ok(features
                .into_iter()
                .filter(|f| {
                    f["properties"][&source.fields.code]
                        .as_str()
                        .is_some_and(|c| c.trim().eq_ignore_ascii_case(code))
                })
                .collect())
        }
    }
}
