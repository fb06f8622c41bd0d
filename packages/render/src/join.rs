//! Left join of one date's case values onto the boundary table.

use chrono::NaiveDate;
use covid_map_cases::CaseTable;
use covid_map_geography::{BoundaryRecord, BoundaryTable};

/// One boundary row with its value for the frame's date.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRow<'a> {
    /// Join key.
    pub key: &'a str,
    /// Borrowed boundary record.
    pub record: &'a BoundaryRecord,
    /// Case count, `None` when the case table has no value.
    pub value: Option<u64>,
}

/// Every boundary row paired with its value on one date.
///
/// Owns no geometry; records are borrowed from the [`BoundaryTable`].
#[derive(Debug, Clone)]
pub struct JoinedFrame<'a> {
    date: NaiveDate,
    rows: Vec<JoinedRow<'a>>,
}

impl<'a> JoinedFrame<'a> {
    /// Joins `cases` onto `boundaries` for `date`.
    #[must_use]
    pub fn build(boundaries: &'a BoundaryTable, cases: &CaseTable, date: NaiveDate) -> Self {
        let rows = boundaries
            .iter()
            .map(|(key, record)| JoinedRow {
                key,
                record,
                value: cases.value(key, date),
            })
            .collect();
        Self { date, rows }
    }

    /// The frame's date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Rows in key order.
    #[must_use]
    pub fn rows(&self) -> &[JoinedRow<'a>] {
        &self.rows
    }

    /// Number of rows that have a value.
    #[must_use]
    pub fn with_data(&self) -> usize {
        self.rows.iter().filter(|r| r.value.is_some()).count()
    }

    /// Largest value in the frame.
    #[must_use]
    pub fn max_value(&self) -> Option<u64> {
        self.rows.iter().filter_map(|r| r.value).max()
    }
}
