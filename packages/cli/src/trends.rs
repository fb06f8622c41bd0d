//! The `trends` subcommand.
//!
//! Writes two date-indexed CSV tables: per-area series for areas that have
//! taken off (with reference doubling curves), and national totals with
//! their fitted curves. Doubling times are logged and printed.

use std::fs::File;
use std::path::Path;

use covid_map_cases::trends::{
    doubling_curve, fit_log_linear, growth_series, parse_series, write_csv,
};
use covid_map_config::AppConfig;

use crate::pipeline;

/// Reference curves drawn with every growth table, in days.
const REFERENCE_PERIODS: [f64; 3] = [2.0, 3.0, 5.0];

/// Starting value of the reference curves.
const REFERENCE_SCALE: f64 = 5.0;

/// Totals columns and the number of trailing days each is fitted over.
const TOTALS_FITS: [(&str, usize); 3] = [("Tests", 18), ("ConfirmedCases", 18), ("Deaths", 13)];

type Columns = Vec<(String, Vec<Option<f64>>)>;

fn reference_columns(n_days: usize) -> Columns {
    REFERENCE_PERIODS
        .iter()
        .map(|period| {
            (
                format!("Doubling every {period} days"),
                doubling_curve(n_days, *period, REFERENCE_SCALE),
            )
        })
        .collect()
}

pub async fn run(
    client: &reqwest::Client,
    config: &AppConfig,
    threshold: u64,
    fit_days: usize,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;

    let (cases, _) = pipeline::load_cases(client, config, Vec::new()).await?;
    let dates = cases.dates();
    let growing = growth_series(&cases, &dates, threshold);
    log::info!(
        "{} of {} areas exceed {threshold} cases",
        growing.len(),
        cases.len()
    );

    let mut columns: Columns = Vec::new();
    let mut doubling: Vec<(String, f64)> = Vec::new();
    for (key, values) in growing {
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<Option<f64>> = values.iter().map(|v| v.map(|v| v as f64)).collect();
        if let Some(days) = fit_log_linear(&values, fit_days).and_then(|f| f.doubling_time()) {
            doubling.push((key.clone(), days));
        }
        columns.push((key, values));
    }
    columns.extend(reference_columns(dates.len()));

    let path = output_dir.join("growth_areas.csv");
    write_csv(File::create(&path)?, &dates, &columns)?;
    println!("Wrote {}", path.display());

    doubling.sort_by(|a, b| a.1.total_cmp(&b.1));
    if !doubling.is_empty() {
        println!("{:<40} DOUBLING (DAYS)", "AREA");
        println!("{}", "-".repeat(56));
        for (key, days) in &doubling {
            println!("{key:<40} {days:.1}");
        }
    }

    let Some(totals) = &config.totals else {
        log::info!("No totals source configured; skipping national trends");
        return Ok(());
    };

    let text = covid_map_fetch::fetch_text(client, &totals.location).await?;
    let series = parse_series(&text)?;

    let mut columns: Columns = Vec::new();
    for (name, last_n) in TOTALS_FITS {
        let Some(values) = series.column(name) else {
            log::warn!("Totals have no '{name}' column");
            continue;
        };
        columns.push((name.to_string(), values.to_vec()));

        match fit_log_linear(values, last_n) {
            Some(fit) => {
                if let Some(days) = fit.doubling_time() {
                    println!("{name}: doubling every {days:.1} days (last {last_n} days)");
                }
                #[allow(clippy::cast_precision_loss)]
                let fitted = (0..values.len())
                    .map(|i| (i + last_n >= values.len()).then(|| fit.predict(i as f64)))
                    .collect();
                columns.push((format!("{name} fit"), fitted));
            }
            None => log::warn!("Not enough positive '{name}' values to fit"),
        }
    }
    columns.extend(reference_columns(series.dates.len()));

    let path = output_dir.join("totals_trends.csv");
    write_csv(File::create(&path)?, &series.dates, &columns)?;
    println!("Wrote {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_curves_double_on_schedule() {
        let columns = reference_columns(7);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].0, "Doubling every 2 days");

        let two_day = &columns[0].1;
        assert_eq!(two_day[0], None);
        let ratio = two_day[6].unwrap() / two_day[4].unwrap();
        assert!((ratio - 2.0).abs() < 1e-9, "ratio {ratio}");
    }
}
