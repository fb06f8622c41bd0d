//! Growth trends over case time series.
//!
//! Reference doubling curves, log-linear fits over the most recent days,
//! and CSV I/O for date-indexed series such as national totals
//! (`Date,Tests,ConfirmedCases,Deaths`).

use std::collections::BTreeMap;
use std::f64::consts::LN_2;
use std::io::Write;

use chrono::NaiveDate;

use crate::{CaseError, CaseTable};

/// Date-indexed numeric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    /// Row dates, ascending as read.
    pub dates: Vec<NaiveDate>,
    /// Column name to one value per date.
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl Series {
    /// Values of one column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// A least-squares fit of `ln(value)` against day index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLinearFit {
    /// Growth rate per day in log space.
    pub slope: f64,
    /// `ln(value)` at day index 0.
    pub intercept: f64,
}

impl LogLinearFit {
    /// Days for the fitted curve to double. `None` unless growing.
    #[must_use]
    pub fn doubling_time(&self) -> Option<f64> {
        (self.slope > 0.0).then(|| LN_2 / self.slope)
    }

    /// Fitted value at day index `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept).exp()
    }
}

/// Reference curve `scale * e^(i * ln2 / period)` for `n_days` days.
///
/// Index 0 is undefined and yields `None`.
#[must_use]
pub fn doubling_curve(n_days: usize, period: f64, scale: f64) -> Vec<Option<f64>> {
    (0..n_days)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f64;
            (i > 0).then(|| scale * (x * LN_2 / period).exp())
        })
        .collect()
}

/// Fits `ln(v)` against index over the last `last_n` entries of `values`.
///
/// Missing and non-positive values are skipped. Needs at least two
/// distinct points.
#[must_use]
pub fn fit_log_linear(values: &[Option<f64>], last_n: usize) -> Option<LogLinearFit> {
    let start = values.len().saturating_sub(last_n);
    #[allow(clippy::cast_precision_loss)]
    let points: Vec<(f64, f64)> = values[start..]
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            v.filter(|v| *v > 0.0 && v.is_finite())
                .map(|v| ((start + i) as f64, v.ln()))
        })
        .collect();

    if points.len() < 2 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(LogLinearFit {
        slope,
        intercept: slope.mul_add(-mean_x, mean_y),
    })
}

/// Doubling time in days of the last `last_n` values.
#[must_use]
pub fn fit_doubling_time(values: &[Option<f64>], last_n: usize) -> Option<f64> {
    fit_log_linear(values, last_n)?.doubling_time()
}

/// Per-area series over `dates` for areas that have taken off.
///
/// Keeps areas whose value on the last date exceeds `threshold` and whose
/// value on the first date exceeds 1.
#[must_use]
pub fn growth_series(
    table: &CaseTable,
    dates: &[NaiveDate],
    threshold: u64,
) -> BTreeMap<String, Vec<Option<u64>>> {
    let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
        return BTreeMap::new();
    };

    table
        .keys()
        .filter(|key| {
            table.value(key, last).is_some_and(|v| v > threshold)
                && table.value(key, first).is_some_and(|v| v > 1)
        })
        .map(|key| {
            (
                key.to_string(),
                dates.iter().map(|d| table.value(key, *d)).collect(),
            )
        })
        .collect()
}

/// Parses a `Date`-indexed CSV of numeric columns.
///
/// Blank or non-numeric cells are `None`.
///
/// # Errors
///
/// Returns [`CaseError`] if the CSV is malformed, has no `Date` column, or
/// holds an unparseable date.
pub fn parse_series(text: &str) -> Result<Series, CaseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let date_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("Date"))
        .ok_or_else(|| CaseError::Parse {
            message: "series has no 'Date' column".to_string(),
        })?;

    let mut series = Series::default();
    for name in headers.iter().enumerate().filter(|(i, _)| *i != date_col) {
        series.columns.insert(name.1.clone(), Vec::new());
    }

    for result in reader.records() {
        let record = result?;
        let raw_date = record.get(date_col).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            CaseError::Parse {
                message: format!("bad date '{raw_date}': {e}"),
            }
        })?;
        series.dates.push(date);

        for (i, name) in headers.iter().enumerate() {
            if i == date_col {
                continue;
            }
            let value = record
                .get(i)
                .and_then(|v| v.trim().replace(',', "").parse::<f64>().ok());
            if let Some(column) = series.columns.get_mut(name) {
                column.push(value);
            }
        }
    }

    Ok(series)
}

/// Writes date-indexed columns as CSV. Missing values are blank.
///
/// # Errors
///
/// Returns [`CaseError`] if writing fails.
pub fn write_csv<W: Write>(
    writer: W,
    dates: &[NaiveDate],
    columns: &[(String, Vec<Option<f64>>)],
) -> Result<(), CaseError> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["Date".to_string()];
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    csv.write_record(&header)?;

    for (row, date) in dates.iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(columns.iter().map(|(_, values)| {
            values
                .get(row)
                .copied()
                .flatten()
                .map_or_else(String::new, format_value)
        }));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, day).unwrap()
    }

    #[test]
    fn doubling_curve_doubles_each_period() {
        let curve = doubling_curve(7, 3.0, 5.0);
        assert_eq!(curve.len(), 7);
        assert_eq!(curve[0], None);
        let c3 = curve[3].unwrap();
        let c6 = curve[6].unwrap();
        assert!((c3 - 10.0).abs() < 1e-9, "got {c3}");
        assert!((c6 - 20.0).abs() < 1e-9, "got {c6}");
    }

    #[test]
    fn recovers_doubling_time() {
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<Option<f64>> = (0..30)
            .map(|i| Some(4.0 * (f64::from(i) * LN_2 / 2.5).exp()))
            .collect();
        let t = fit_doubling_time(&values, 18).unwrap();
        assert!((t - 2.5).abs() < 1e-9, "got {t}");

        let fit = fit_log_linear(&values, 18).unwrap();
        assert!((fit.predict(10.0) - values[10].unwrap()).abs() < 1e-6);
    }

    #[test]
    fn fit_skips_gaps_and_needs_two_points() {
        let values = vec![None, Some(0.0), Some(10.0), None, Some(40.0)];
        // Points at index 2 and 4: x4 in two days.
        let t = fit_doubling_time(&values, 13).unwrap();
        assert!((t - 1.0).abs() < 1e-9, "got {t}");

        assert_eq!(fit_doubling_time(&[Some(5.0)], 13), None);
        assert_eq!(fit_doubling_time(&[Some(5.0), Some(5.0)], 13), None);
        assert_eq!(fit_doubling_time(&[Some(8.0), Some(4.0)], 13), None);
    }

    #[test]
    fn selects_growing_areas() {
        let mut table = CaseTable::new();
        table.insert("Big", d(1), 5);
        table.insert("Big", d(3), 120);
        table.insert("Late", d(1), 1);
        table.insert("Late", d(3), 200);
        table.insert("Small", d(1), 3);
        table.insert("Small", d(3), 20);
        table.insert("Gappy", d(3), 90);

        let series = growth_series(&table, &[d(1), d(2), d(3)], 30);
        assert_eq!(series.keys().collect::<Vec<_>>(), vec!["Big"]);
        assert_eq!(series["Big"], vec![Some(5), None, Some(120)]);
        assert!(growth_series(&table, &[], 30).is_empty());
    }

    #[test]
    fn parses_and_writes_series() {
        let text = "\
Date,Tests,ConfirmedCases,Deaths
2020-03-01,\"11,750\",36,
2020-03-02,13525,40,0
";
        let series = parse_series(text).unwrap();
        assert_eq!(series.dates, vec![d(1), d(2)]);
        assert_eq!(series.column("Tests").unwrap(), &[Some(11750.0), Some(13525.0)]);
        assert_eq!(series.column("Deaths").unwrap(), &[None, Some(0.0)]);

        let mut out = Vec::new();
        write_csv(
            &mut out,
            &series.dates,
            &[
                (
                    "ConfirmedCases".to_string(),
                    series.column("ConfirmedCases").unwrap().to_vec(),
                ),
                ("Doubling".to_string(), vec![None, Some(1.5)]),
            ],
        )
        .unwrap();
        let written = String::from_utf8(out).unwrap();
        assert_eq!(
            written,
            "Date,ConfirmedCases,Doubling\n2020-03-01,36,\n2020-03-02,40,1.500\n"
        );
    }

    #[test]
    fn series_needs_valid_dates() {
        assert!(parse_series("Tests\n1\n").is_err());
        assert!(parse_series("Date,Tests\n03/01/2020,1\n").is_err());
    }
}
