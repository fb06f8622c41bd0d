//! Loading steps shared by the subcommands.
//!
//! Cases are loaded first so that code-keyed runs know which boundaries to
//! look up. Name-keyed runs load one boundary table in full. Either way
//! the records go through the reconciler, the case table is folded with
//! the same merge groups, and unmatched keys are reported.

use chrono::NaiveDate;
use covid_map_cases::{CaseSource, CaseTable, sources::load_first_available};
use covid_map_config::AppConfig;
use covid_map_geography::{
    BoundaryTable,
    reconcile::match_keys,
    sources::{load_table, lookup_codes},
};
use covid_map_geography_models::{KeyField, ViewRegion};

/// Countries whose case rows any of `regions` needs. Empty means all.
pub fn countries_for(regions: &[&ViewRegion]) -> Vec<String> {
    if regions.iter().any(|r| r.countries.is_empty()) {
        return Vec::new();
    }
    let mut countries: Vec<String> = regions
        .iter()
        .flat_map(|r| r.countries.iter().cloned())
        .collect();
    countries.sort();
    countries.dedup();
    countries
}

/// Loads the first available case table and folds its merge groups.
pub async fn load_cases<'a>(
    client: &reqwest::Client,
    config: &'a AppConfig,
    countries: Vec<String>,
) -> Result<(CaseTable, &'a CaseSource), Box<dyn std::error::Error>> {
    let options = config.long_format_options(countries);
    let (mut cases, source) = load_first_available(client, &config.case_sources, &options).await?;
    log::info!(
        "Using case source '{}': {} areas, {} dates",
        source.id,
        cases.len(),
        cases.dates().len()
    );
    cases.fold(&config.merge_groups);
    Ok((cases, source))
}

/// Loads, projects and reconciles boundaries for `cases`.
///
/// Code-keyed runs look up each case-table code through the ordered
/// boundary sources; codes no source has are logged and drawn as missing.
pub async fn load_boundaries(
    client: &reqwest::Client,
    config: &AppConfig,
    cases: &CaseTable,
) -> Result<BoundaryTable, Box<dyn std::error::Error>> {
    let reconciler = config.reconciler()?;
    let projection = config.projection()?;

    let records = match config.key_field {
        KeyField::Name => {
            let source = config
                .table_source()
                .ok_or("configuration has no boundary sources")?;
            load_table(client, source).await?
        }
        KeyField::Code => {
            // Merge targets are not boundary codes; look up their members.
            let mut codes: Vec<String> = cases
                .keys()
                .filter(|k| !config.merge_groups.iter().any(|g| g.target == *k))
                .map(ToString::to_string)
                .collect();
            for group in &config.merge_groups {
                if cases.contains_key(&group.target) {
                    codes.extend(group.members.iter().cloned());
                }
            }
            codes.sort();
            codes.dedup();

            log::info!("Looking up {} boundaries by code", codes.len());
            let (found, missing) = lookup_codes(client, &config.boundary_sources, &codes).await;
            if !missing.is_empty() {
                log::warn!("{} codes have no boundary: {}", missing.len(), missing.join(", "));
            }
            found
        }
    };

    let boundaries = reconciler.reconcile(records, &projection)?;
    match_keys(&boundaries, cases.keys()).log_warnings();
    Ok(boundaries)
}

/// Case-table dates within `[from, to]`.
pub fn select_dates(
    cases: &CaseTable,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    cases
        .dates()
        .into_iter()
        .filter(|d| from.is_none_or(|f| *d >= f) && to.is_none_or(|t| *d <= t))
        .collect()
}
