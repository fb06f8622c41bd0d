#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary loading, projection and region reconciliation.
//!
//! Administrative boundary polygons come from ONS `ArcGIS` services or
//! local `GeoJSON` exports and are partitioned slightly differently from
//! the case-count tables they are joined against. [`reconcile`] unions and
//! relabels the boundary records so every key matches the case table,
//! failing fast on inconsistent merge definitions.

pub mod fetchers;
pub mod normalize;
pub mod projection;
pub mod reconcile;
pub mod sources;
pub mod table;

use thiserror::Error;

pub use table::{BoundaryRecord, BoundaryTable};

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Retrieving a boundary resource failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] covid_map_fetch::FetchError),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Merge or rename definitions are inconsistent with each other or
    /// with the boundary table.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A coordinate could not be projected.
    #[error("Projection error: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// Every configured boundary source was tried without finding the
    /// requested area.
    #[error("No boundary source has area {code} (tried: {})", .tried.join(", "))]
    SourcesExhausted {
        /// Area code that was looked up.
        code: String,
        /// Ids of the sources that were tried, in order.
        tried: Vec<String>,
    },
}

/// A merge or rename definition that cannot be applied.
///
/// Always fatal to the reconciliation run: it is reported, never silently
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A merge group names a record absent from the boundary table.
    #[error("Merge group '{group}' references '{name}', which is not in the boundary table")]
    MissingSource {
        /// Merge group id.
        group: String,
        /// Missing member key.
        name: String,
    },

    /// Two merge groups claim the same record.
    #[error("Merge groups '{first}' and '{second}' both claim '{name}'")]
    OverlappingGroups {
        /// Group that claimed the record first.
        first: String,
        /// Group that claimed it again.
        second: String,
        /// Contested key.
        name: String,
    },

    /// A merge group has fewer than two members.
    #[error("Merge group '{group}' needs at least two members")]
    TooFewMembers {
        /// Merge group id.
        group: String,
    },

    /// Two records would end up with the same key.
    #[error("Duplicate boundary key '{key}'")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// A rename names a record absent from the boundary table.
    #[error("Rename from '{from}' references a record that is not in the boundary table")]
    MissingRename {
        /// Missing key.
        from: String,
    },
}
