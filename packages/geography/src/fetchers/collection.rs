//! Plain `GeoJSON` `FeatureCollection` fetcher, for URLs and local
//! exports alike.

use crate::GeoError;

/// Fetches all features from a `GeoJSON` `FeatureCollection` at
/// `location` (URL or file path).
///
/// # Errors
///
/// Returns [`GeoError`] if retrieval fails or the document has no
/// `features` array.
pub async fn fetch(
    client: &reqwest::Client,
    location: &str,
) -> Result<Vec<serde_json::Value>, GeoError> {
    let json = covid_map_fetch::fetch_json(client, location).await?;

    let features = json["features"]
        .as_array()
        .ok_or_else(|| GeoError::Conversion {
            message: format!("No features array in GeoJSON document at {location}"),
        })?;

    Ok(features.clone())
}
