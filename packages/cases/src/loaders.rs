//! CSV parsers for the two case-table layouts.
//!
//! Long format has one row per (area, date) observation:
//!
//! ```text
//! Date,Country,AreaCode,Area,TotalCases
//! 2020-03-20,England,E09000012,Hackney and City of London,19
//! ```
//!
//! Pivoted format has one row per area and one `dd/mm` column per date,
//! with the area name in the first column.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use covid_map_geography_models::KeyField;

use crate::{AreaInfo, CaseError, CaseTable};

/// Options for parsing a long-format table.
#[derive(Debug, Clone, Default)]
pub struct LongFormatOptions {
    /// Which column keys the table: `Area` or `AreaCode`.
    pub key_field: KeyField,
    /// Only keep rows from these countries. Empty keeps everything.
    pub countries: Vec<String>,
    /// Placeholder area names to drop.
    pub excluded_areas: Vec<String>,
}

/// Returns `true` if `area` is a placeholder row such as
/// "awaiting clarification".
#[must_use]
pub fn is_excluded(area: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|e| e.eq_ignore_ascii_case(area))
}

/// Parses a cumulative count. Non-integer cells ("1 to 4") are no data.
fn parse_count(raw: &str) -> Option<u64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<u64>()
        .ok()
        .or_else(|| {
            // Some exports write counts as floats ("12.0").
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
                .map(|v| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let n = v as u64;
                    n
                })
        })
}

fn column(headers: &[String], name: &str) -> Result<usize, CaseError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| CaseError::Parse {
            message: format!("missing '{name}' column (headers: {})", headers.join(",")),
        })
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Parses a long-format table.
///
/// # Errors
///
/// Returns [`CaseError`] if the CSV is malformed or a required column is
/// missing.
pub fn parse_long(text: &str, options: &LongFormatOptions) -> Result<CaseTable, CaseError> {
    let mut reader = reader(text);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let date_col = column(&headers, "Date")?;
    let country_col = column(&headers, "Country")?;
    let code_col = column(&headers, "AreaCode")?;
    let area_col = column(&headers, "Area")?;
    let cases_col = column(&headers, "TotalCases")?;

    let mut table = CaseTable::new();
    let mut skipped = 0usize;

    for result in reader.records() {
        let record = result?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let country = field(country_col);
        if !options.countries.is_empty()
            && !options
                .countries
                .iter()
                .any(|c| c.eq_ignore_ascii_case(country))
        {
            continue;
        }

        let area = field(area_col);
        let code = field(code_col);
        if is_excluded(area, &options.excluded_areas) {
            continue;
        }

        let key = match options.key_field {
            KeyField::Name => area,
            KeyField::Code => code,
        };
        if key.is_empty() {
            skipped += 1;
            continue;
        }

        let Ok(date) = NaiveDate::parse_from_str(field(date_col), "%Y-%m-%d") else {
            log::debug!("Skipping row for {key} with bad date '{}'", field(date_col));
            skipped += 1;
            continue;
        };

        let Some(count) = parse_count(field(cases_col)) else {
            log::debug!(
                "No usable count for {key} on {date}: '{}'",
                field(cases_col)
            );
            skipped += 1;
            continue;
        };

        if let Some(previous) = table.insert(key, date, count)
            && previous != count
        {
            log::debug!("Duplicate row for {key} on {date}: {previous} replaced by {count}");
        }

        if table.area_info(key).is_none() {
            let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
            table.set_area_info(
                key,
                AreaInfo {
                    name: non_empty(area),
                    code: non_empty(code),
                    country: non_empty(country),
                },
            );
        }
    }

    log::info!(
        "Parsed {} areas over {} dates ({skipped} rows skipped)",
        table.len(),
        table.dates().len()
    );
    Ok(table)
}

/// Parses a `dd/mm` header into a date in `year`.
fn parse_day_month(header: &str, year: i32) -> Option<NaiveDate> {
    let (day, month) = header.trim().split_once('/')?;
    NaiveDate::from_ymd_opt(year, month.trim().parse().ok()?, day.trim().parse().ok()?)
}

/// Parses a pivoted table keyed by area name.
///
/// Columns whose header is not a `dd/mm` date are ignored.
///
/// # Errors
///
/// Returns [`CaseError`] if the CSV is malformed or has no date columns.
pub fn parse_pivoted(text: &str, year: i32, excluded: &[String]) -> Result<CaseTable, CaseError> {
    let mut reader = reader(text);
    let date_columns: BTreeMap<usize, NaiveDate> = reader
        .headers()?
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, h)| parse_day_month(h, year).map(|d| (i, d)))
        .collect();

    if date_columns.is_empty() {
        return Err(CaseError::Parse {
            message: "pivoted table has no dd/mm date columns".to_string(),
        });
    }

    let mut table = CaseTable::new();
    for result in reader.records() {
        let record = result?;
        let area = record.get(0).unwrap_or("").trim();
        if area.is_empty() || is_excluded(area, excluded) {
            continue;
        }

        for (&i, &date) in &date_columns {
            if let Some(count) = record.get(i).and_then(parse_count) {
                table.insert(area, date, count);
            }
        }
        table.set_area_info(
            area,
            AreaInfo {
                name: Some(area.to_string()),
                ..AreaInfo::default()
            },
        );
    }

    log::info!(
        "Parsed {} areas over {} date columns",
        table.len(),
        date_columns.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "\
Date,Country,AreaCode,Area,TotalCases
2020-03-19,England,E09000012,Hackney and City of London,15
2020-03-20,England,E09000012,Hackney and City of London,19
2020-03-20,England,E06000052,Cornwall and Isles of Scilly,1 to 4
2020-03-20,Wales,W11000029,Cardiff,34
2020-03-20,Wales,,Resident outside Wales,3
2020-03-20,Scotland,S08000029,Fife,\"1,024\"
2020-03-20,England,,,7
";

    fn excluded() -> Vec<String> {
        vec![
            "awaiting clarification".to_string(),
            "Resident outside Wales".to_string(),
        ]
    }

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, month, day).unwrap()
    }

    #[test]
    fn parses_long_format_by_name() {
        let table = parse_long(
            LONG,
            &LongFormatOptions {
                excluded_areas: excluded(),
                ..LongFormatOptions::default()
            },
        )
        .unwrap();

        assert_eq!(table.value("Hackney and City of London", d(3, 19)), Some(15));
        assert_eq!(table.value("Hackney and City of London", d(3, 20)), Some(19));
        assert_eq!(table.value("Fife", d(3, 20)), Some(1024));
        // "1 to 4" is no data, not an error.
        assert!(!table.contains_key("Cornwall and Isles of Scilly"));
        assert!(!table.contains_key("Resident outside Wales"));
        assert_eq!(table.len(), 3);

        let info = table.area_info("Cardiff").unwrap();
        assert_eq!(info.code.as_deref(), Some("W11000029"));
        assert_eq!(info.country.as_deref(), Some("Wales"));
    }

    #[test]
    fn parses_long_format_by_code_and_country() {
        let table = parse_long(
            LONG,
            &LongFormatOptions {
                key_field: KeyField::Code,
                countries: vec!["England".to_string()],
                excluded_areas: excluded(),
            },
        )
        .unwrap();

        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["E09000012"]);
    }

    #[test]
    fn long_format_requires_columns() {
        let err = parse_long("Date,Area\n2020-03-20,Wirral\n", &LongFormatOptions::default())
            .unwrap_err();
        assert!(matches!(err, CaseError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn parses_pivoted_table() {
        let text = "\
,Notes,07/03,08/03,09/03
Wirral,,1,2,
Cardiff,x,,4,6
awaiting clarification,,5,5,5
";
        let table = parse_pivoted(text, 2020, &excluded()).unwrap();

        assert_eq!(table.value("Wirral", d(3, 7)), Some(1));
        assert_eq!(table.value("Wirral", d(3, 9)), None);
        assert_eq!(table.value("Cardiff", d(3, 9)), Some(6));
        assert!(!table.contains_key("awaiting clarification"));
        assert_eq!(table.dates(), vec![d(3, 7), d(3, 8), d(3, 9)]);
    }

    #[test]
    fn pivoted_table_needs_dates() {
        assert!(parse_pivoted("Area,Total\nWirral,3\n", 2020, &[]).is_err());
    }

    #[test]
    fn counts() {
        assert_eq!(parse_count(" 12 "), Some(12));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("12.5"), None);
        assert_eq!(parse_count("1 to 4"), None);
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count(""), None);
    }
}
