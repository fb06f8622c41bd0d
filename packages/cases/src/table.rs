//! The sparse (area, date) → count table.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use covid_map_geography_models::MergeGroup;

/// Descriptive attributes of one case-table area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaInfo {
    /// Area name, when the source has one.
    pub name: Option<String>,
    /// ONS area code, when the source has one.
    pub code: Option<String>,
    /// Constituent country (`England`, `Scotland`, ...).
    pub country: Option<String>,
}

/// Cumulative case counts by area key and date.
///
/// Sparse: a missing cell means no data, which is distinct from zero.
/// Read-only once loading and folding are done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseTable {
    cells: BTreeMap<String, BTreeMap<NaiveDate, u64>>,
    areas: BTreeMap<String, AreaInfo>,
}

impl CaseTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one cell, returning the previous value if there was one.
    pub fn insert(&mut self, key: &str, date: NaiveDate, value: u64) -> Option<u64> {
        self.cells
            .entry(key.to_string())
            .or_default()
            .insert(date, value)
    }

    /// Records descriptive attributes for an area.
    pub fn set_area_info(&mut self, key: &str, info: AreaInfo) {
        self.areas.insert(key.to_string(), info);
    }

    /// Attributes recorded for an area.
    #[must_use]
    pub fn area_info(&self, key: &str) -> Option<&AreaInfo> {
        self.areas.get(key)
    }

    /// The value for `key` on `date`, if present.
    #[must_use]
    pub fn value(&self, key: &str, date: NaiveDate) -> Option<u64> {
        self.cells.get(key)?.get(&date).copied()
    }

    /// All values for one area, in date order.
    #[must_use]
    pub fn series(&self, key: &str) -> Option<&BTreeMap<NaiveDate, u64>> {
        self.cells.get(key)
    }

    /// Area keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Returns `true` if the table has a row for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    /// Every date with at least one value, ascending.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.cells
            .values()
            .flat_map(BTreeMap::keys)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Latest date with any value.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.cells
            .values()
            .filter_map(|row| row.keys().next_back())
            .max()
            .copied()
    }

    /// Number of areas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the table has no areas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Largest value among `keys` over `dates`. `None` if every cell is
    /// missing.
    pub fn max_over<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a str>,
        dates: &[NaiveDate],
    ) -> Option<u64> {
        keys.into_iter()
            .filter_map(|key| self.cells.get(key))
            .flat_map(|row| dates.iter().filter_map(|d| row.get(d).copied()))
            .max()
    }

    /// Folds the members of each merge group into the group's target.
    ///
    /// For every date where the target has no value of its own, the target
    /// takes the sum of the members present on that date. Member rows are
    /// then removed. Groups whose members are all absent are skipped.
    pub fn fold(&mut self, groups: &[MergeGroup]) {
        for group in groups {
            let members: Vec<BTreeMap<NaiveDate, u64>> = group
                .members
                .iter()
                .filter(|m| **m != group.target)
                .filter_map(|m| self.cells.remove(m))
                .collect();
            if members.is_empty() {
                continue;
            }

            let mut summed: BTreeMap<NaiveDate, u64> = BTreeMap::new();
            for row in &members {
                for (date, value) in row {
                    *summed.entry(*date).or_default() += value;
                }
            }

            let target = self.cells.entry(group.target.clone()).or_default();
            for (date, value) in summed {
                target.entry(date).or_insert(value);
            }

            let member_info: Vec<AreaInfo> = group
                .members
                .iter()
                .filter_map(|m| self.areas.remove(m))
                .collect();
            if !self.areas.contains_key(&group.target) {
                let country = member_info.iter().find_map(|i| i.country.clone());
                self.areas.insert(
                    group.target.clone(),
                    AreaInfo {
                        name: Some(group.target.clone()),
                        code: group.target_code.clone(),
                        country,
                    },
                );
            }

            log::debug!(
                "Folded {} case rows into '{}'",
                members.len(),
                group.target
            );
        }
    }

    /// Area codes of every area in one of `countries`, sorted.
    #[must_use]
    pub fn codes_for_countries(&self, countries: &[String]) -> Vec<String> {
        self.areas
            .values()
            .filter(|info| {
                info.country
                    .as_ref()
                    .is_some_and(|c| countries.iter().any(|want| want.eq_ignore_ascii_case(c)))
            })
            .filter_map(|info| info.code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Keys of every area in one of `countries`.
    ///
    /// An empty `countries` list matches every key.
    #[must_use]
    pub fn keys_for_countries(&self, countries: &[String]) -> Vec<String> {
        self.cells
            .keys()
            .filter(|key| {
                countries.is_empty()
                    || self
                        .areas
                        .get(*key)
                        .and_then(|info| info.country.as_ref())
                        .is_some_and(|c| countries.iter().any(|want| want.eq_ignore_ascii_case(c)))
            })
            .cloned()
            .collect()
    }
}
