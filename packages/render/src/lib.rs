#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-frame choropleth preparation.
//!
//! Joins case values onto the reconciled boundary table one date at a
//! time, derives each view region's classification scale from the areas
//! wholly inside its window, and hands the result to a [`FrameRenderer`].
//! The bundled [`GeoJsonFrameWriter`] writes one styled `GeoJSON` document
//! per (region, date) for an external rasterizer.

pub mod batch;
pub mod frame;
pub mod join;
pub mod progress;
pub mod window;

use thiserror::Error;

pub use batch::{BatchOptions, BatchReport, FrameFailure, animation_hint, render_frames};
pub use frame::{FrameContext, FrameRenderer, GeoJsonFrameWriter, frame_file_name, frame_prefix};
pub use join::{JoinedFrame, JoinedRow};
pub use progress::{NullProgress, ProgressCallback};

/// Errors that can occur while preparing or writing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// IO error while writing a frame.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The view window could not be projected.
    #[error("Geography error: {0}")]
    Geo(#[from] covid_map_geography::GeoError),

    /// No area in the view window has data over the rendered dates.
    #[error("No case data inside the '{region}' view window")]
    NoData {
        /// View region name.
        region: String,
    },
}
