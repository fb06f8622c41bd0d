#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Case-count tables keyed by area and date.
//!
//! Loads cumulative confirmed-case counts from long-format
//! (`Date,Country,AreaCode,Area,TotalCases`) or date-pivoted CSV sources,
//! drops placeholder rows, folds aggregated areas so keys line up with the
//! reconciled boundary table, and derives simple growth trends.

pub mod loaders;
pub mod sources;
pub mod table;
pub mod trends;

use thiserror::Error;

pub use sources::{CaseFormat, CaseSource};
pub use table::{AreaInfo, CaseTable};

/// Errors that can occur while loading or processing case data.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Retrieving a case resource failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] covid_map_fetch::FetchError),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error while writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The table is missing a column or holds an unparseable header.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// Every configured case source was tried without producing data.
    #[error("No case source produced data (tried: {})", .tried.join(", "))]
    SourcesExhausted {
        /// Ids of the sources that were tried, in order.
        tried: Vec<String>,
    },
}
