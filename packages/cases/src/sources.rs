//! Case-source definitions and the ordered fallback chain.

use covid_map_geography_models::KeyField;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::{
    CaseError, CaseTable,
    loaders::{self, LongFormatOptions},
};

/// A configured case-count source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSource {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// URL or local path.
    pub location: String,
    /// Table layout.
    pub format: CaseFormat,
    /// Attribution shown on rendered frames.
    #[serde(default)]
    pub attribution: Option<String>,
}

/// Layout of a case table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaseFormat {
    /// `Date,Country,AreaCode,Area,TotalCases` rows.
    Long,
    /// One row per area name, one `dd/mm` column per date.
    Pivoted {
        /// Year the `dd/mm` headers belong to.
        year: i32,
    },
}

/// Fetches and parses one case source.
///
/// Pivoted sources are always keyed by name; `options.key_field` only
/// applies to long-format sources.
///
/// # Errors
///
/// Returns [`CaseError`] if retrieval or parsing fails.
pub async fn load_source(
    client: &reqwest::Client,
    source: &CaseSource,
    options: &LongFormatOptions,
) -> Result<CaseTable, CaseError> {
    log::info!("Loading case counts from {} ({})", source.name, source.location);
    let text = covid_map_fetch::fetch_text(client, &source.location).await?;

    match &source.format {
        CaseFormat::Long => loaders::parse_long(&text, options),
        CaseFormat::Pivoted { year } => {
            if options.key_field != KeyField::Name {
                log::warn!(
                    "{}: pivoted tables are keyed by name, ignoring key field {}",
                    source.id,
                    options.key_field
                );
            }
            loaders::parse_pivoted(&text, *year, &options.excluded_areas)
        }
    }
}

/// Tries each source in order and returns the first non-empty table.
///
/// # Errors
///
/// Returns [`CaseError::SourcesExhausted`] if every source failed or was
/// empty.
pub async fn load_first_available<'a>(
    client: &reqwest::Client,
    sources: &'a [CaseSource],
    options: &LongFormatOptions,
) -> Result<(CaseTable, &'a CaseSource), CaseError> {
    let mut tried = Vec::new();

    for source in sources {
        tried.push(source.id.clone());
        match load_source(client, source, options).await {
            Ok(table) if !table.is_empty() => return Ok((table, source)),
            Ok(_) => log::warn!("{}: no case rows, trying next source", source.id),
            Err(e) => log::warn!("{}: {e}, trying next source", source.id),
        }
    }

    Err(CaseError::SourcesExhausted { tried })
}
