#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the covid map toolchain.
//!
//! Uses `indicatif-log-bridge` (via [`covid_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod pipeline;
mod trends;

use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covid_map_classify::{ClassificationScale, ScaleKind};
use covid_map_cli_utils::FrameProgress;
use covid_map_render::{BatchOptions, GeoJsonFrameWriter, render_frames};

#[derive(Parser)]
#[command(name = "covid_map", about = "Choropleth frames of cumulative COVID-19 cases")]
struct Cli {
    /// Configuration file replacing the embedded UK configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one frame per (view region, date)
    Frames {
        /// Comma-separated view region names (default: all configured)
        #[arg(long)]
        regions: Option<String>,
        /// First date to render (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last date to render (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Directory the frames are written to
        #[arg(long, default_value = "FIGURES")]
        output_dir: PathBuf,
        /// Bucket count (overrides the configuration)
        #[arg(long, value_parser = parse_buckets)]
        buckets: Option<usize>,
        /// Use equal-width buckets instead of logarithmic ones
        #[arg(long)]
        linear: bool,
    },
    /// Reconcile boundaries with the case table and report unmatched keys
    Reconcile {
        /// Write the reconciled boundary table as `GeoJSON`
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the classification scale for a maximum value
    Scale {
        /// Largest value the scale must cover
        max: f64,
        /// Bucket count (overrides the configuration)
        #[arg(long, value_parser = parse_buckets)]
        buckets: Option<usize>,
        /// Use equal-width buckets instead of logarithmic ones
        #[arg(long)]
        linear: bool,
    },
    /// Write growth and doubling-time trend tables
    Trends {
        /// Areas must exceed this many cases on the last date
        #[arg(long, default_value = "30")]
        threshold: u64,
        /// Days used for the area-level doubling fits
        #[arg(long, default_value = "18")]
        fit_days: usize,
        /// Directory the CSV files are written to
        #[arg(long, default_value = "DATA")]
        output_dir: PathBuf,
    },
    /// List configured boundary and case sources
    Sources,
}

fn parse_buckets(value: &str) -> Result<usize, String> {
    let buckets: usize = value.trim().parse().map_err(|e| format!("{e}"))?;
    covid_map_config::check_buckets(buckets).map_err(|e| e.to_string())
}

const fn scale_kind(linear: bool) -> ScaleKind {
    if linear {
        ScaleKind::Linear
    } else {
        ScaleKind::Logarithmic
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = covid_map_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = covid_map_config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Frames {
            regions,
            from,
            to,
            output_dir,
            buckets,
            linear,
        } => {
            let start = Instant::now();
            let selected = match regions {
                Some(names) => names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(|name| {
                        config
                            .view_region(name)
                            .ok_or_else(|| format!("unknown view region '{name}'"))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                None => config.view_regions.iter().collect(),
            };
            if selected.is_empty() {
                return Err("no view regions selected".into());
            }

            let client = covid_map_fetch::build_client()?;
            let (cases, source) = pipeline::load_cases(
                &client,
                &config,
                pipeline::countries_for(&selected),
            )
            .await?;
            let boundaries = pipeline::load_boundaries(&client, &config, &cases).await?;

            let dates = pipeline::select_dates(&cases, from, to);
            if dates.is_empty() {
                return Err("no case data in the requested date range".into());
            }
            log::info!(
                "Rendering {} regions over {} dates ({} to {})",
                selected.len(),
                dates.len(),
                dates[0],
                dates[dates.len() - 1]
            );

            let regions: Vec<_> = selected.into_iter().cloned().collect();
            let options = BatchOptions {
                buckets: buckets.unwrap_or(config.buckets),
                min_scale_max: config.min_scale_max,
                scale_kind: scale_kind(linear),
                attribution: source.attribution.clone().or_else(|| config.attribution.clone()),
            };
            let writer = GeoJsonFrameWriter::new(output_dir);
            let progress = FrameProgress::new(&multi, "Rendering frames");

            let report = render_frames(
                &boundaries,
                &cases,
                &regions,
                &dates,
                &config.projection()?,
                &writer,
                &options,
                &progress,
            );

            log::info!(
                "Wrote {} frames to {} in {:.1}s",
                report.rendered.len(),
                writer.output_dir().display(),
                start.elapsed().as_secs_f64()
            );
            if !report.is_success() {
                log::warn!("{} frames failed", report.failed.len());
            }
        }
        Commands::Reconcile { output } => {
            let client = covid_map_fetch::build_client()?;
            let (cases, _) = pipeline::load_cases(&client, &config, Vec::new()).await?;
            let boundaries = pipeline::load_boundaries(&client, &config, &cases).await?;
            println!(
                "{} boundaries, {} case areas",
                boundaries.len(),
                cases.len()
            );

            if let Some(path) = output {
                let collection = boundaries.to_feature_collection();
                std::fs::write(&path, serde_json::to_string(&collection)?)?;
                println!("Wrote {}", path.display());
            }
        }
        Commands::Scale {
            max,
            buckets,
            linear,
        } => {
            let buckets = buckets.unwrap_or(config.buckets);
            let scale = match scale_kind(linear) {
                ScaleKind::Logarithmic => ClassificationScale::logarithmic(max, buckets),
                ScaleKind::Linear => ClassificationScale::linear(max, buckets),
            };
            if scale.is_degraded() {
                println!(
                    "Scale degraded: {} buckets requested, {} produced",
                    buckets,
                    scale.buckets()
                );
            }
            println!("Ticks: {:?}", scale.ticks());
            println!("{:<16} COLOR", "RANGE");
            println!("{}", "-".repeat(26));
            for entry in scale.legend() {
                println!("{:<16} {}", entry.label, entry.color);
            }
        }
        Commands::Trends {
            threshold,
            fit_days,
            output_dir,
        } => {
            let client = covid_map_fetch::build_client()?;
            trends::run(&client, &config, threshold, fit_days, &output_dir).await?;
        }
        Commands::Sources => {
            println!("Boundary sources:");
            println!("{:<20} {:<10} NAME", "ID", "PREFIXES");
            println!("{}", "-".repeat(60));
            for source in &config.boundary_sources {
                let prefixes = if source.code_prefixes.is_empty() {
                    "*".to_string()
                } else {
                    source.code_prefixes.join(",")
                };
                println!("{:<20} {:<10} {}", source.id, prefixes, source.name);
            }
            println!();
            println!("Case sources (in fallback order):");
            println!("{:<20} NAME", "ID");
            println!("{}", "-".repeat(60));
            for source in &config.case_sources {
                println!("{:<20} {}", source.id, source.name);
            }
        }
    }

    Ok(())
}
