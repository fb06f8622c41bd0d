//! `ArcGIS` `MapServer` / `FeatureServer` fetcher.
//!
//! Queries an ONS `ArcGIS` REST endpoint with `f=geojson` and `outSR=4326`
//! so features arrive as standard `GeoJSON` in WGS84 degrees. Paginates via
//! `resultOffset` while the server reports `exceededTransferLimit`.

use crate::GeoError;

/// Fetches all features matching `where_clause` from an `ArcGIS` query
/// endpoint.
///
/// # Errors
///
/// Returns [`GeoError`] if the request fails, the service returns an
/// error envelope, or the response has no `features` array.
pub async fn fetch(
    client: &reqwest::Client,
    base_url: &str,
    where_clause: &str,
    max_records: Option<u32>,
) -> Result<Vec<serde_json::Value>, GeoError> {
    let record_count = max_records.unwrap_or(1000);
    let mut all_features = Vec::new();
    let mut offset = 0u32;

    loop {
        let url = query_url(base_url, where_clause, record_count, offset);
        let json = covid_map_fetch::fetch_json(client, &url).await?;

        // ArcGIS error envelope: {"error": {"code": 400, "message": "..."}}
        if let Some(error) = json.get("error") {
            return Err(GeoError::Conversion {
                message: format!(
                    "ArcGIS API error {}: {}",
                    error["code"].as_i64().unwrap_or(0),
                    error["message"].as_str().unwrap_or("unknown error")
                ),
            });
        }

        let features = json["features"]
            .as_array()
            .ok_or_else(|| GeoError::Conversion {
                message: format!("No features array in ArcGIS response (offset={offset})"),
            })?;

        if features.is_empty() {
            break;
        }

        all_features.extend(features.iter().cloned());

        if !json["exceededTransferLimit"].as_bool().unwrap_or(false) {
            break;
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            offset += features.len() as u32;
        }
        log::info!(
            "Fetched {} features so far from {base_url}, fetching next page...",
            all_features.len()
        );
    }

    Ok(all_features)
}

/// Builds a paginated `f=geojson` query URL.
fn query_url(base_url: &str, where_clause: &str, record_count: u32, offset: u32) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{base_url}{sep}where={}\
         &outFields=*\
         &outSR=4326\
         &f=geojson\
         &returnGeometry=true\
         &resultRecordCount={record_count}\
         &resultOffset={offset}",
        encode_query_value(where_clause)
    )
}

/// Percent-encodes the characters that appear in `ArcGIS` where clauses.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '=' => out.push_str("%3D"),
            '\'' => out.push_str("%27"),
            '&' => out.push_str("%26"),
            '+' => out.push_str("%2B"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_code_lookup_clause() {
        assert_eq!(
            encode_query_value("UPPER(lad19cd) like '%E09000012%'"),
            "UPPER(lad19cd)%20like%20%27%25E09000012%25%27"
        );
        assert_eq!(encode_query_value("1=1"), "1%3D1");
    }

    #[test]
    fn builds_paginated_url() {
        let url = query_url("https://example.com/MapServer/0/query", "1=1", 500, 1000);
        assert!(url.starts_with("https://example.com/MapServer/0/query?where=1%3D1"));
        assert!(url.contains("&outSR=4326"));
        assert!(url.contains("&f=geojson"));
        assert!(url.ends_with("&resultRecordCount=500&resultOffset=1000"));

        let with_query = query_url("https://example.com/query?token=x", "1=1", 10, 0);
        assert!(with_query.starts_with("https://example.com/query?token=x&where="));
    }
}
