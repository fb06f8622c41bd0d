#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary source, merge group and view region definitions.
//!
//! These are plain configuration types deserialized from TOML. The
//! administrative knowledge they encode (which local authorities the case
//! tables report together, where the ONS boundary services live) is
//! reference data supplied by configuration, never derived in code.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which boundary attribute is used as the join key against the case
/// table.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeyField {
    /// Natural-language area name (e.g. "Hackney and City of London").
    #[default]
    Name,
    /// Stable ONS area code (e.g. "E09000012").
    Code,
}

/// A set of boundary records that the case source reports as one
/// aggregate area.
///
/// Members are keys in the configured [`KeyField`]. The merged polygon is
/// relabelled `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeGroup {
    /// Short identifier used in error messages (e.g. `"HCoL"`).
    pub id: String,
    /// Keys of the boundary records to union. At least two.
    pub members: Vec<String>,
    /// Canonical key of the merged record.
    pub target: String,
    /// Code to give the merged record when keying by name. Defaults to
    /// the first member's code.
    #[serde(default)]
    pub target_code: Option<String>,
    /// Free-form caveat logged when the group is applied (e.g. an area
    /// that is folded into a neighbour by the boundary source).
    #[serde(default)]
    pub note: Option<String>,
}

/// A plain relabel of one boundary key, applied after all merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    /// Existing key.
    pub from: String,
    /// Replacement key.
    pub to: String,
}

/// A rectangular map window rendered as one frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRegion {
    /// Short name used in output file names (e.g. `"London"`).
    pub name: String,
    /// Frame title.
    #[serde(default)]
    pub title: Option<String>,
    /// Longitude range `[min, max]` in degrees.
    pub xlim: [f64; 2],
    /// Latitude range `[min, max]` in degrees.
    pub ylim: [f64; 2],
    /// Where the date label is anchored, in map coordinates.
    #[serde(default)]
    pub date_loc: Option<[f64; 2]>,
    /// Countries whose case rows feed this region (long-format sources
    /// only). Empty means all.
    #[serde(default)]
    pub countries: Vec<String>,
}

impl ViewRegion {
    /// Frame title, falling back to a generic one built from the name.
    #[must_use]
    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            format!("COVID-19 total confirmed cases for {} by local authority", self.name)
        })
    }

    /// Returns `true` if the window has a positive extent on both axes.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.xlim[0] < self.xlim[1] && self.ylim[0] < self.ylim[1]
    }
}

/// A boundary data source, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySource {
    /// Unique source identifier (e.g. `"ons_lad19"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// How to fetch the features.
    pub fetcher: BoundaryFetcherConfig,
    /// Which feature properties hold the area name and code.
    pub fields: BoundaryFieldMapping,
    /// ONS code prefixes this source serves (e.g. `["S"]` for Scottish
    /// health boards). Empty means any code.
    #[serde(default)]
    pub code_prefixes: Vec<String>,
}

impl BoundarySource {
    /// Returns `true` if this source may hold the boundary for `code`.
    #[must_use]
    pub fn serves_code(&self, code: &str) -> bool {
        self.code_prefixes.is_empty()
            || self
                .code_prefixes
                .iter()
                .any(|p| code.to_uppercase().starts_with(&p.to_uppercase()))
    }
}

/// How to fetch boundary features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundaryFetcherConfig {
    /// `ArcGIS` `MapServer`/`FeatureServer` query endpoint, requested with
    /// `f=geojson`.
    Arcgis {
        /// Base query URL (up to `.../query`).
        url: String,
        /// Maximum records to request per page (default: 1000).
        #[serde(default)]
        max_records: Option<u32>,
    },
    /// URL returning a standard `GeoJSON` `FeatureCollection`.
    GeojsonUrl {
        /// Full URL.
        url: String,
    },
    /// Local `GeoJSON` `FeatureCollection` file.
    GeojsonFile {
        /// Path to the file.
        path: String,
    },
}

/// Feature property names holding the area name and code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryFieldMapping {
    /// Property holding the area name (e.g. `"lad19nm"`).
    pub name: String,
    /// Property holding the area code (e.g. `"lad19cd"`).
    pub code: String,
}
