//! Boundary records and the reconciled, uniquely-keyed boundary table.

use std::collections::BTreeMap;

use covid_map_geography_models::KeyField;
use geo::MultiPolygon;

/// One administrative area: its polygon plus name and ONS code.
///
/// Immutable once loaded. Per-date case values live in a separate table
/// joined by key.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRecord {
    /// Natural-language area name.
    pub name: String,
    /// ONS area code.
    pub code: String,
    /// Area outline.
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryRecord {
    /// Returns the attribute selected by `field`.
    #[must_use]
    pub fn key(&self, field: KeyField) -> &str {
        match field {
            KeyField::Name => &self.name,
            KeyField::Code => &self.code,
        }
    }

    /// Replaces the attribute selected by `field`.
    pub fn set_key(&mut self, field: KeyField, key: String) {
        match field {
            KeyField::Name => self.name = key,
            KeyField::Code => self.code = key,
        }
    }
}

/// Reconciled boundary records, unique by key.
///
/// Read-only after reconciliation; frames borrow geometry from it.
#[derive(Debug, Clone)]
pub struct BoundaryTable {
    key_field: KeyField,
    records: BTreeMap<String, BoundaryRecord>,
}

impl BoundaryTable {
    pub(crate) const fn from_map(
        key_field: KeyField,
        records: BTreeMap<String, BoundaryRecord>,
    ) -> Self {
        Self { key_field, records }
    }

    /// Which attribute the table is keyed by.
    #[must_use]
    pub const fn key_field(&self) -> KeyField {
        self.key_field
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BoundaryRecord> {
        self.records.get(key)
    }

    /// Returns `true` if a record with `key` exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Iterates keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Iterates `(key, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundaryRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Exports the table as a `GeoJSON` `FeatureCollection` with `key`,
    /// `name` and `code` properties.
    #[must_use]
    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        let features = self
            .iter()
            .map(|(key, record)| {
                let mut properties = serde_json::Map::new();
                properties.insert("key".to_string(), key.into());
                properties.insert("name".to_string(), record.name.clone().into());
                properties.insert("code".to_string(), record.code.clone().into());
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &record.geometry,
                    ))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y),
            (x: x + 1.0, y: y),
            (x: x + 1.0, y: y + 1.0),
            (x: x, y: y + 1.0),
            (x: x, y: y),
        ]])
    }

    #[test]
    fn key_selects_attribute() {
        let mut record = BoundaryRecord {
            name: "Wirral".to_string(),
            code: "E08000015".to_string(),
            geometry: square(0.0, 0.0),
        };
        assert_eq!(record.key(KeyField::Name), "Wirral");
        assert_eq!(record.key(KeyField::Code), "E08000015");

        record.set_key(KeyField::Name, "Wirral MBC".to_string());
        assert_eq!(record.name, "Wirral MBC");
    }

    #[test]
    fn exports_feature_collection() {
        let mut map = BTreeMap::new();
        map.insert(
            "Wirral".to_string(),
            BoundaryRecord {
                name: "Wirral".to_string(),
                code: "E08000015".to_string(),
                geometry: square(0.0, 0.0),
            },
        );
        let table = BoundaryTable::from_map(KeyField::Name, map);

        let fc = table.to_feature_collection();
        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(
            feature.property("code").and_then(serde_json::Value::as_str),
            Some("E08000015")
        );
        assert!(feature.geometry.is_some());
    }
}
