#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `covid_map` binary.
//!
//! [`FrameProgress`] shows a frame batch as an `indicatif` bar, and
//! [`init_logger`] routes `pretty_env_logger` through
//! `indicatif-log-bridge` so log lines never tear the bar.

use std::time::Duration;

use covid_map_render::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Log target prefix shared by the workspace crates.
const LOG_TARGET_PREFIX: &str = "covid_map";

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const BAR_TEMPLATE: &str = "  {msg:<20} {wide_bar:.cyan/dim} {pos}/{len} frames [{eta}]";

/// A frame batch progress bar.
///
/// Spins while cases and boundaries load, then switches to a bar once the
/// batch reports how many frames it will render. The message tracks the
/// view region being drawn.
pub struct FrameProgress {
    bar: ProgressBar,
}

impl FrameProgress {
    /// Adds a spinner to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        Self { bar }
    }
}

impl ProgressCallback for FrameProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger behind an `indicatif-log-bridge` wrapper
/// and returns the [`MultiProgress`] every bar must be added to.
///
/// `RUST_LOG` is honoured when set. Otherwise the workspace crates log at
/// `info` and dependencies at `warn`.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => {
            builder.parse_filters(&filters);
        }
        Err(_) => {
            builder
                .filter_level(log::LevelFilter::Warn)
                .filter_module(LOG_TARGET_PREFIX, log::LevelFilter::Info);
        }
    }
    let logger = builder.build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
