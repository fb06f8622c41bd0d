//! Region reconciliation.
//!
//! Boundary sources and case tables partition a handful of areas
//! differently: the case tables report Hackney and the City of London as
//! one area, Cornwall with the Isles of Scilly, and so on. The
//! [`RegionReconciler`] unions the member polygons of each [`MergeGroup`]
//! into one record under the canonical key, then applies plain
//! [`Rename`]s, producing a [`BoundaryTable`] whose keys line up with the
//! case table.
//!
//! Merge groups must be disjoint. Overlaps, missing members and key
//! collisions are [`ConfigurationError`]s and abort the run.

use std::collections::{BTreeMap, BTreeSet};

use covid_map_geography_models::{KeyField, MergeGroup, Rename};
use geo::{BooleanOps as _, MultiPolygon};

use crate::projection::Projector;
use crate::{BoundaryRecord, BoundaryTable, ConfigurationError, GeoError};

/// Merges and relabels raw boundary records into a [`BoundaryTable`].
#[derive(Debug, Clone)]
pub struct RegionReconciler {
    key_field: KeyField,
    groups: Vec<MergeGroup>,
    renames: Vec<Rename>,
}

impl RegionReconciler {
    /// Creates a reconciler, validating that the merge groups are
    /// well-formed and pairwise disjoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::TooFewMembers`] for a group with fewer
    /// than two members and [`ConfigurationError::OverlappingGroups`] when
    /// a key is claimed by two groups (either as a member or as a target
    /// that another group consumes).
    pub fn new(
        key_field: KeyField,
        groups: Vec<MergeGroup>,
        renames: Vec<Rename>,
    ) -> Result<Self, ConfigurationError> {
        validate_groups(&groups)?;
        Ok(Self {
            key_field,
            groups,
            renames,
        })
    }

    /// Key attribute the reconciled table is indexed by.
    #[must_use]
    pub const fn key_field(&self) -> KeyField {
        self.key_field
    }

    /// Number of rows a table of `original_count` records shrinks to.
    ///
    /// Repeated members of one group count once.
    #[must_use]
    pub fn expected_len(&self, original_count: usize) -> usize {
        let removed: usize = self
            .groups
            .iter()
            .map(|g| g.members.iter().collect::<BTreeSet<_>>().len() - 1)
            .sum();
        original_count.saturating_sub(removed)
    }

    /// Projects, merges and relabels `records`.
    ///
    /// Each record is first moved into the target projection via
    /// `projector`. Then every merge group's members are removed and
    /// replaced by one record holding the union of their polygons, keyed
    /// by the group's target. Renames run last.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Configuration`] if two raw records share a key,
    /// a group member or rename source is absent, or a merged/renamed key
    /// collides with an existing one. Returns [`GeoError::Projection`] if
    /// a record cannot be projected.
    pub fn reconcile(
        &self,
        records: Vec<BoundaryRecord>,
        projector: &dyn Projector,
    ) -> Result<BoundaryTable, GeoError> {
        let original_count = records.len();
        let mut by_key: BTreeMap<String, BoundaryRecord> = BTreeMap::new();

        for mut record in records {
            record.geometry = projector.project(&record.geometry)?;
            let key = record.key(self.key_field).to_string();
            if by_key.insert(key.clone(), record).is_some() {
                return Err(ConfigurationError::DuplicateKey { key }.into());
            }
        }

        for group in &self.groups {
            self.apply_group(&mut by_key, group)?;
        }

        for rename in &self.renames {
            self.apply_rename(&mut by_key, rename)?;
        }

        log::info!(
            "Reconciled {original_count} boundary records into {} ({} merge groups, {} renames, EPSG:{})",
            by_key.len(),
            self.groups.len(),
            self.renames.len(),
            projector.epsg()
        );

        Ok(BoundaryTable::from_map(self.key_field, by_key))
    }

    fn apply_group(
        &self,
        by_key: &mut BTreeMap<String, BoundaryRecord>,
        group: &MergeGroup,
    ) -> Result<(), ConfigurationError> {
        if let Some(missing) = group.members.iter().find(|m| !by_key.contains_key(*m)) {
            return Err(ConfigurationError::MissingSource {
                group: group.id.clone(),
                name: missing.clone(),
            });
        }

        let members: Vec<BoundaryRecord> = group
            .members
            .iter()
            .filter_map(|m| by_key.remove(m))
            .collect();

        if by_key.contains_key(&group.target) {
            return Err(ConfigurationError::DuplicateKey {
                key: group.target.clone(),
            });
        }

        let geometry = union_all(members.iter().map(|r| &r.geometry));

        let merged = match self.key_field {
            KeyField::Name => BoundaryRecord {
                name: group.target.clone(),
                code: group
                    .target_code
                    .clone()
                    .unwrap_or_else(|| members[0].code.clone()),
                geometry,
            },
            KeyField::Code => BoundaryRecord {
                name: members
                    .iter()
                    .map(|r| r.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" and "),
                code: group.target.clone(),
                geometry,
            },
        };

        if let Some(note) = &group.note {
            log::info!("Merge group '{}': {note}", group.id);
        }
        log::debug!(
            "Merged {} into '{}'",
            group.members.join(", "),
            group.target
        );

        by_key.insert(group.target.clone(), merged);
        Ok(())
    }

    fn apply_rename(
        &self,
        by_key: &mut BTreeMap<String, BoundaryRecord>,
        rename: &Rename,
    ) -> Result<(), ConfigurationError> {
        if rename.from == rename.to {
            return Ok(());
        }
        if by_key.contains_key(&rename.to) {
            return Err(ConfigurationError::DuplicateKey {
                key: rename.to.clone(),
            });
        }
        let mut record =
            by_key
                .remove(&rename.from)
                .ok_or_else(|| ConfigurationError::MissingRename {
                    from: rename.from.clone(),
                })?;
        record.set_key(self.key_field, rename.to.clone());
        by_key.insert(rename.to.clone(), record);
        Ok(())
    }
}

/// Checks group sizes and that no key is claimed twice.
fn validate_groups(groups: &[MergeGroup]) -> Result<(), ConfigurationError> {
    let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();

    for group in groups {
        let distinct: BTreeSet<&str> = group.members.iter().map(String::as_str).collect();
        if distinct.len() < 2 {
            return Err(ConfigurationError::TooFewMembers {
                group: group.id.clone(),
            });
        }
        for member in distinct {
            if let Some(first) = claimed.insert(member, group.id.as_str()) {
                return Err(ConfigurationError::OverlappingGroups {
                    first: first.to_string(),
                    second: group.id.clone(),
                    name: member.to_string(),
                });
            }
        }
    }

    // A target that another group consumes makes the result depend on
    // application order.
    for group in groups {
        if let Some(consumer) = claimed.get(group.target.as_str())
            && *consumer != group.id
        {
            return Err(ConfigurationError::OverlappingGroups {
                first: group.id.clone(),
                second: (*consumer).to_string(),
                name: group.target.clone(),
            });
        }
    }

    Ok(())
}

/// Unions polygon sets into one.
fn union_all<'a>(geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    geometries
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, g| {
            if acc.0.is_empty() {
                g.clone()
            } else {
                acc.union(g)
            }
        })
}

/// Keys present on only one side of a boundary/case join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMatchReport {
    /// Case-table keys with no boundary record. Rendered as no data.
    pub missing_boundaries: Vec<String>,
    /// Boundary keys with no case-table row. Rendered as no data.
    pub missing_cases: Vec<String>,
}

impl KeyMatchReport {
    /// Returns `true` if every key matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_boundaries.is_empty() && self.missing_cases.is_empty()
    }

    /// Logs each unmatched key as a warning, plus a summary line.
    pub fn log_warnings(&self) {
        for key in &self.missing_boundaries {
            log::warn!("Case area '{key}' has no boundary record; it will not be drawn");
        }
        for key in &self.missing_cases {
            log::warn!("Boundary '{key}' has no case data; it will be drawn as no data");
        }
        if !self.is_complete() {
            log::warn!(
                "{} case areas without boundaries, {} boundaries without case data",
                self.missing_boundaries.len(),
                self.missing_cases.len()
            );
        }
    }
}

/// Compares the reconciled table's keys against the case table's keys.
#[must_use]
pub fn match_keys<'a>(
    table: &BoundaryTable,
    case_keys: impl IntoIterator<Item = &'a str>,
) -> KeyMatchReport {
    let case_keys: BTreeSet<&str> = case_keys.into_iter().collect();
    let boundary_keys: BTreeSet<&str> = table.keys().collect();

    KeyMatchReport {
        missing_boundaries: case_keys
            .difference(&boundary_keys)
            .map(ToString::to_string)
            .collect(),
        missing_cases: boundary_keys
            .difference(&case_keys)
            .map(ToString::to_string)
            .collect(),
    }
}
