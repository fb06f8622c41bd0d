#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Run configuration.
//!
//! The UK reference data (merge groups, view regions, boundary and case
//! sources, placeholder areas) lives in `config/uk.toml`, baked into the
//! binary with [`include_str!`]. A user file with the same schema replaces
//! it wholesale, which lets fixtures substitute synthetic definitions.

use std::collections::BTreeSet;
use std::path::Path;

use covid_map_cases::{CaseSource, loaders::LongFormatOptions};
use covid_map_geography::{
    ConfigurationError, projection::Projection, reconcile::RegionReconciler,
};
use covid_map_geography_models::{BoundarySource, KeyField, MergeGroup, Rename, ViewRegion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The embedded UK configuration.
const UK_TOML: &str = include_str!("../config/uk.toml");

/// Largest bucket count a scale may be asked for.
pub const MAX_BUCKETS: usize = 64;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not match the schema.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Merge group definitions are inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A value is out of range or an id is repeated.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Where national totals for the trends command come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsSource {
    /// URL or local path of a `Date,Tests,ConfirmedCases,Deaths` CSV.
    pub location: String,
}

/// Everything a run needs besides the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Attribute boundary and case tables are joined on.
    #[serde(default)]
    pub key_field: KeyField,
    /// Requested bucket count per scale.
    #[serde(default = "default_buckets")]
    pub buckets: usize,
    /// Floor applied to each region's maximum before scaling.
    #[serde(default = "default_min_scale_max")]
    pub min_scale_max: u64,
    /// EPSG code of the output projection.
    #[serde(default = "default_projection_epsg")]
    pub projection_epsg: u32,
    /// Boundary source loaded in full for name-keyed runs. Defaults to
    /// the first boundary source.
    #[serde(default)]
    pub boundary_table_source: Option<String>,
    /// Attribution added to every frame.
    #[serde(default)]
    pub attribution: Option<String>,
    /// Placeholder case-table areas to drop.
    #[serde(default)]
    pub excluded_areas: Vec<String>,
    /// Aggregated areas.
    #[serde(default)]
    pub merge_groups: Vec<MergeGroup>,
    /// Relabels applied after merging.
    #[serde(default)]
    pub renames: Vec<Rename>,
    /// Map windows frames are rendered for.
    #[serde(default)]
    pub view_regions: Vec<ViewRegion>,
    /// Boundary sources, in lookup order.
    #[serde(default)]
    pub boundary_sources: Vec<BoundarySource>,
    /// Case sources, in fallback order.
    #[serde(default)]
    pub case_sources: Vec<CaseSource>,
    /// National totals.
    #[serde(default)]
    pub totals: Option<TotalsSource>,
}

const fn default_buckets() -> usize {
    13
}

const fn default_min_scale_max() -> u64 {
    10
}

const fn default_projection_epsg() -> u32 {
    4326
}

/// Parses and validates a configuration document.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML is malformed or fails validation.
pub fn parse(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// The embedded UK configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] if the embedded document fails validation.
pub fn embedded() -> Result<AppConfig, ConfigError> {
    parse(UK_TOML)
}

/// Loads `path` if given, otherwise the embedded configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or
/// validated.
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            parse(&std::fs::read_to_string(path)?)
        }
        None => embedded(),
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid { message }
}

/// Checks a requested bucket count against `2..=MAX_BUCKETS`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if `buckets` is out of range.
pub fn check_buckets(buckets: usize) -> Result<usize, ConfigError> {
    if (2..=MAX_BUCKETS).contains(&buckets) {
        Ok(buckets)
    } else {
        Err(invalid(format!(
            "buckets must be between 2 and {MAX_BUCKETS}, got {buckets}"
        )))
    }
}

fn check_unique<'a>(kind: &str, ids: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {kind} '{id}'")));
        }
    }
    Ok(())
}

impl AppConfig {
    /// Checks ranges, id uniqueness, window shapes and merge groups.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_buckets(self.buckets)?;
        self.projection()?;

        check_unique(
            "boundary source",
            self.boundary_sources.iter().map(|s| s.id.as_str()),
        )?;
        check_unique("case source", self.case_sources.iter().map(|s| s.id.as_str()))?;
        check_unique(
            "view region",
            self.view_regions.iter().map(|r| r.name.as_str()),
        )?;
        check_unique(
            "merge group",
            self.merge_groups.iter().map(|g| g.id.as_str()),
        )?;

        if let Some(region) = self.view_regions.iter().find(|r| !r.is_well_formed()) {
            return Err(invalid(format!(
                "view region '{}' has unordered limits {:?} / {:?}",
                region.name, region.xlim, region.ylim
            )));
        }

        if let Some(id) = &self.boundary_table_source
            && !self.boundary_sources.iter().any(|s| &s.id == id)
        {
            return Err(invalid(format!("unknown boundary table source '{id}'")));
        }

        self.reconciler()?;
        Ok(())
    }

    /// The output projection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unsupported EPSG code.
    pub fn projection(&self) -> Result<Projection, ConfigError> {
        Projection::from_epsg(self.projection_epsg).ok_or_else(|| {
            invalid(format!(
                "unsupported projection EPSG:{} (expected 4326 or 3857)",
                self.projection_epsg
            ))
        })
    }

    /// A reconciler over this configuration's merge groups and renames.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Configuration`] if the merge groups overlap
    /// or are too small.
    pub fn reconciler(&self) -> Result<RegionReconciler, ConfigError> {
        Ok(RegionReconciler::new(
            self.key_field,
            self.merge_groups.clone(),
            self.renames.clone(),
        )?)
    }

    /// The boundary source loaded in full for name-keyed runs.
    #[must_use]
    pub fn table_source(&self) -> Option<&BoundarySource> {
        match &self.boundary_table_source {
            Some(id) => self.boundary_sources.iter().find(|s| &s.id == id),
            None => self.boundary_sources.first(),
        }
    }

    /// Looks up a view region by name, ignoring case.
    #[must_use]
    pub fn view_region(&self, name: &str) -> Option<&ViewRegion> {
        self.view_regions
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Long-format parsing options restricted to `countries`.
    #[must_use]
    pub fn long_format_options(&self, countries: Vec<String>) -> LongFormatOptions {
        LongFormatOptions {
            key_field: self.key_field,
            countries,
            excluded_areas: self.excluded_areas.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Number of view regions in the embedded configuration.
    const EXPECTED_VIEW_REGION_COUNT: usize = 7;

    #[test]
    fn embedded_config_loads() {
        let config = embedded().unwrap();
        assert_eq!(config.view_regions.len(), EXPECTED_VIEW_REGION_COUNT);
        assert_eq!(config.merge_groups.len(), 3);
        assert_eq!(config.buckets, 13);
        assert_eq!(config.min_scale_max, 10);
        assert_eq!(config.projection().unwrap(), Projection::Wgs84);
        assert_eq!(config.table_source().unwrap().id, "ctyua17_file");
        assert!(!config.case_sources.is_empty());
        assert!(config.totals.is_some());
    }

    #[test]
    fn embedded_view_regions() {
        let config = embedded().unwrap();
        let nw = config.view_region("nw").unwrap();
        assert_eq!(nw.xlim, [-3.4, -1.9]);
        assert_eq!(nw.ylim, [52.8, 53.9]);
        assert_eq!(nw.date_loc, Some([-3.35, 53.8]));

        let ni = config.view_region("Northern Ireland").unwrap();
        assert_eq!(ni.countries, vec!["Northern Ireland".to_string()]);
        assert!(ni.title().contains("Northern Ireland"));
    }

    #[test]
    fn embedded_sources_route_by_prefix() {
        let config = embedded().unwrap();
        let scottish: Vec<&str> = config
            .boundary_sources
            .iter()
            .filter(|s| s.serves_code("S08000029"))
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(scottish, vec!["sg_health_boards"]);

        let english = config
            .boundary_sources
            .iter()
            .filter(|s| s.serves_code("E09000012"))
            .count();
        assert_eq!(english, 4);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.key_field, KeyField::Name);
        assert_eq!(config.buckets, 13);
        assert!(config.merge_groups.is_empty());
        assert!(config.table_source().is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse("buckets = 1"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            parse("buckets = 100000"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            parse("projection_epsg = 27700"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            parse("boundary_table_source = \"nope\""),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(parse("buckets = \"many\""), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn bucket_range() {
        assert_eq!(check_buckets(2).unwrap(), 2);
        assert_eq!(check_buckets(MAX_BUCKETS).unwrap(), MAX_BUCKETS);
        assert!(check_buckets(1).is_err());
        assert!(check_buckets(usize::MAX).is_err());
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_windows() {
        let dup = r#"
[[view_regions]]
name = "NW"
xlim = [-3.4, -1.9]
ylim = [52.8, 53.9]

[[view_regions]]
name = "NW"
xlim = [-3.4, -1.9]
ylim = [52.8, 53.9]
"#;
        assert!(matches!(parse(dup), Err(ConfigError::Invalid { .. })));

        let inverted = r#"
[[view_regions]]
name = "Backwards"
xlim = [2.0, -9.0]
ylim = [50.0, 60.0]
"#;
        assert!(matches!(parse(inverted), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_overlapping_merge_groups() {
        let overlapping = r#"
[[merge_groups]]
id = "one"
members = ["A", "B"]
target = "AB"

[[merge_groups]]
id = "two"
members = ["B", "C"]
target = "BC"
"#;
        match parse(overlapping) {
            Err(ConfigError::Configuration(ConfigurationError::OverlappingGroups {
                first,
                second,
                name,
            })) => {
                assert_eq!((first.as_str(), second.as_str(), name.as_str()), ("one", "two", "B"));
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }
}
