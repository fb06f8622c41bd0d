//! Loading boundary records from configured sources.
//!
//! A full table comes from one source. Individual areas missing from that
//! table can be looked up by code across an ordered list of sources; the
//! first source that returns a usable record wins, and running out of
//! sources is a typed error.

use covid_map_geography_models::BoundarySource;

use crate::{BoundaryRecord, GeoError, fetchers, normalize::normalize_features};

/// Loads every boundary record a source provides.
///
/// # Errors
///
/// Returns [`GeoError`] if fetching fails.
pub async fn load_table(
    client: &reqwest::Client,
    source: &BoundarySource,
) -> Result<Vec<BoundaryRecord>, GeoError> {
    log::info!("Loading boundaries from {} ({})", source.name, source.id);
    let features = fetchers::fetch_features(client, source).await?;
    let records = normalize_features(&features, &source.fields);
    log::info!("{}: {} boundary records", source.id, records.len());
    Ok(records)
}

/// Looks up one area by code, trying each source that serves the code in
/// order.
///
/// Fetch failures and empty results move on to the next source; both are
/// logged.
///
/// # Errors
///
/// Returns [`GeoError::SourcesExhausted`] listing the sources tried when
/// none of them has the area.
pub async fn lookup_code(
    client: &reqwest::Client,
    sources: &[BoundarySource],
    code: &str,
) -> Result<BoundaryRecord, GeoError> {
    let mut tried = Vec::new();

    for source in sources.iter().filter(|s| s.serves_code(code)) {
        tried.push(source.id.clone());

        let features = match fetchers::fetch_features_for_code(client, source, code).await {
            Ok(features) => features,
            Err(e) => {
                log::warn!("{}: lookup of {code} failed: {e}", source.id);
                continue;
            }
        };

        let records = normalize_features(&features, &source.fields);
        if let Some(record) = exact_match(records, code) {
            log::debug!("{}: found {code} ({})", source.id, record.name);
            return Ok(record);
        }

        log::debug!("{}: no boundary for {code}", source.id);
    }

    Err(GeoError::SourcesExhausted {
        code: code.to_string(),
        tried,
    })
}

/// The record whose code is exactly `code`, ignoring case.
///
/// `ArcGIS` `like` queries also return records whose code merely contains
/// `code`; those would never join, so they count as not found.
fn exact_match(records: Vec<BoundaryRecord>, code: &str) -> Option<BoundaryRecord> {
    records
        .into_iter()
        .find(|r| r.code.trim().eq_ignore_ascii_case(code.trim()))
}

/// Looks up several codes, continuing past failures.
///
/// Returns the records found and the codes no source could provide.
pub async fn lookup_codes(
    client: &reqwest::Client,
    sources: &[BoundarySource],
    codes: &[String],
) -> (Vec<BoundaryRecord>, Vec<String>) {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for code in codes {
        match lookup_code(client, sources, code).await {
            Ok(record) => found.push(record),
            Err(e) => {
                log::warn!("{e}");
                missing.push(code.clone());
            }
        }
    }

    (found, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covid_map_geography_models::{BoundaryFetcherConfig, BoundaryFieldMapping};
    use std::path::Path;

    fn feature(name: &str, code: &str, x: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "properties": {"nm": name, "cd": code},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[x, 50.0], [x + 1.0, 50.0], [x + 1.0, 51.0], [x, 50.0]]]
            }
        })
    }

    fn write_collection(path: &Path, features: Vec<serde_json::Value>) {
        let doc = serde_json::json!({"type": "FeatureCollection", "features": features});
        std::fs::write(path, doc.to_string()).unwrap();
    }

    fn file_source(id: &str, path: &Path, prefixes: &[&str]) -> BoundarySource {
        BoundarySource {
            id: id.to_string(),
            name: id.to_string(),
            fetcher: BoundaryFetcherConfig::GeojsonFile {
                path: path.to_string_lossy().to_string(),
            },
            fields: BoundaryFieldMapping {
                name: "nm".to_string(),
                code: "cd".to_string(),
            },
            code_prefixes: prefixes.iter().map(ToString::to_string).collect(),
        }
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    fn boundary(name: &str, code: &str) -> BoundaryRecord {
        BoundaryRecord {
            name: name.to_string(),
            code: code.to_string(),
            geometry: geo::MultiPolygon::new(Vec::new()),
        }
    }

    #[test]
    fn only_exact_codes_match() {
        let substring_hits = vec![
            boundary("Aberdeen City", "S120000033"),
            boundary("Fife", "S08000029"),
        ];
        assert_eq!(
            exact_match(substring_hits.clone(), "s08000029").map(|r| r.name),
            Some("Fife".to_string())
        );
        assert!(exact_match(substring_hits, "S1200000").is_none());
        assert!(exact_match(vec![boundary("Wirral", "E08000015")], "E0800001").is_none());
    }

    #[tokio::test]
    async fn loads_whole_table() {
        let tmp = temp_dir("covid_map_sources_load_table");
        let path = tmp.join("lad.geojson");
        write_collection(
            &path,
            vec![feature("Wirral", "E08000015", -3.0), feature("Sefton", "E08000014", -3.1)],
        );

        let client = covid_map_fetch::build_client().unwrap();
        let records = load_table(&client, &file_source("lad", &path, &[]))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Wirral");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn falls_back_to_later_sources() {
        let tmp = temp_dir("covid_map_sources_fallback");
        let first = tmp.join("first.geojson");
        let second = tmp.join("second.geojson");
        write_collection(&first, vec![feature("Wirral", "E08000015", -3.0)]);
        write_collection(&second, vec![feature("Cornwall", "E06000052", -5.0)]);

        let sources = vec![
            file_source("first", &first, &[]),
            // Unreadable sources are skipped, not fatal.
            file_source("broken", &tmp.join("missing.geojson"), &[]),
            file_source("second", &second, &[]),
        ];

        let client = covid_map_fetch::build_client().unwrap();
        let record = lookup_code(&client, &sources, "e06000052").await.unwrap();
        assert_eq!(record.name, "Cornwall");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn exhaustion_lists_sources_tried() {
        let tmp = temp_dir("covid_map_sources_exhausted");
        let lad = tmp.join("lad.geojson");
        let hb = tmp.join("hb.geojson");
        write_collection(&lad, vec![feature("Wirral", "E08000015", -3.0)]);
        write_collection(&hb, vec![feature("Fife", "S08000029", -3.2)]);

        let sources = vec![
            file_source("lad", &lad, &["E", "W"]),
            file_source("health_boards", &hb, &["S"]),
        ];

        let client = covid_map_fetch::build_client().unwrap();

        // Scottish codes only go to the health board source.
        let fife = lookup_code(&client, &sources, "S08000029").await.unwrap();
        assert_eq!(fife.name, "Fife");

        let err = lookup_code(&client, &sources, "E09000001").await.unwrap_err();
        match err {
            GeoError::SourcesExhausted { code, tried } => {
                assert_eq!(code, "E09000001");
                assert_eq!(tried, vec!["lad".to_string()]);
            }
            other => panic!("expected SourcesExhausted, got {other:?}"),
        }

        let (found, missing) = lookup_codes(
            &client,
            &sources,
            &["E08000015".to_string(), "N09000001".to_string()],
        )
        .await;
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec!["N09000001".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
