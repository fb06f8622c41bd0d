//! Normalizes raw `GeoJSON` features into [`BoundaryRecord`] values.
//!
//! Uses the source's [`BoundaryFieldMapping`] to pull the area name and
//! code out of each feature regardless of the service's property naming
//! (`lad19nm`, `ctyua17nm`, `HBName`, ...).

use covid_map_geography_models::BoundaryFieldMapping;
use geo::MultiPolygon;

use crate::BoundaryRecord;

/// Normalizes a list of raw `GeoJSON` features into boundary records.
///
/// Features with a missing name or code, or a non-areal geometry, are
/// skipped with a warning.
#[must_use]
pub fn normalize_features(
    features: &[serde_json::Value],
    fields: &BoundaryFieldMapping,
) -> Vec<BoundaryRecord> {
    let records: Vec<BoundaryRecord> = features
        .iter()
        .filter_map(|feature| {
            let record = normalize_feature(feature, fields);
            if record.is_none() {
                log::warn!(
                    "Skipping boundary feature without usable {}/{}/geometry: {}",
                    fields.name,
                    fields.code,
                    truncate_for_log(&feature["properties"].to_string(), 200)
                );
            }
            record
        })
        .collect();

    log::debug!(
        "Normalized {} of {} boundary features",
        records.len(),
        features.len()
    );
    records
}

/// Normalizes a single `GeoJSON` feature.
fn normalize_feature(
    feature: &serde_json::Value,
    fields: &BoundaryFieldMapping,
) -> Option<BoundaryRecord> {
    let props = feature.get("properties")?;

    let name = property_string(props, &fields.name)?;
    let code = property_string(props, &fields.code)?;

    let geometry = feature.get("geometry")?;
    if geometry.is_null() {
        return None;
    }

    Some(BoundaryRecord {
        name,
        code,
        geometry: parse_multipolygon(geometry)?,
    })
}

/// Reads a trimmed, non-empty string property. Numeric codes are
/// stringified.
fn property_string(props: &serde_json::Value, field: &str) -> Option<String> {
    let value = props.get(field)?;
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Parses a `GeoJSON` geometry object into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_multipolygon(geometry: &serde_json::Value) -> Option<MultiPolygon<f64>> {
    let geom: geojson::Geometry = serde_json::from_value(geometry.clone()).ok()?;
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        _ => None,
    }
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BoundaryFieldMapping {
        BoundaryFieldMapping {
            name: "lad19nm".to_string(),
            code: "lad19cd".to_string(),
        }
    }

    #[test]
    fn normalizes_polygon_and_multipolygon() {
        let features = vec![
            serde_json::json!({
                "type": "Feature",
                "properties": {"lad19nm": " Wirral ", "lad19cd": "E08000015"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-3.2, 53.3], [-3.0, 53.3], [-3.0, 53.4], [-3.2, 53.3]]]
                }
            }),
            serde_json::json!({
                "type": "Feature",
                "properties": {"lad19nm": "Isles of Scilly", "lad19cd": "E06000053"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-6.4, 49.9], [-6.3, 49.9], [-6.3, 50.0], [-6.4, 49.9]]],
                        [[[-6.2, 49.9], [-6.1, 49.9], [-6.1, 50.0], [-6.2, 49.9]]]
                    ]
                }
            }),
        ];

        let records = normalize_features(&features, &fields());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Wirral");
        assert_eq!(records[0].code, "E08000015");
        assert_eq!(records[0].geometry.0.len(), 1);
        assert_eq!(records[1].geometry.0.len(), 2);
    }

    #[test]
    fn skips_unusable_features() {
        let features = vec![
            // No code
            serde_json::json!({
                "type": "Feature",
                "properties": {"lad19nm": "Nowhere"},
                "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}
            }),
            // Point geometry
            serde_json::json!({
                "type": "Feature",
                "properties": {"lad19nm": "Dot", "lad19cd": "E1"},
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
            }),
            // Null geometry
            serde_json::json!({
                "type": "Feature",
                "properties": {"lad19nm": "Void", "lad19cd": "E2"},
                "geometry": null
            }),
        ];

        assert!(normalize_features(&features, &fields()).is_empty());
    }

    #[test]
    fn numeric_codes_are_stringified() {
        let props = serde_json::json!({"objectid": 42, "blank": "  "});
        assert_eq!(property_string(&props, "objectid").as_deref(), Some("42"));
        assert_eq!(property_string(&props, "blank"), None);
        assert_eq!(property_string(&props, "absent"), None);
    }
}
