#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Discrete color classification for choropleth frames.
//!
//! A [`ClassificationScale`] is a pure function of the largest value to be
//! drawn and the requested bucket count. It yields integer tick boundaries,
//! one fill color per inter-tick bucket, and sentinel colors for values
//! below the first tick, at or above the last tick, or missing entirely.

pub mod palette;
pub mod scale;

pub use palette::Color;
pub use scale::{Bucket, ClassificationScale, LegendEntry, ScaleKind};
