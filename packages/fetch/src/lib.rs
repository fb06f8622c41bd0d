#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Retrieval of boundary and case-count resources.
//!
//! A resource is addressed by a *location* string that is either an
//! `http(s)://` URL or a local path (optionally prefixed with `file://`).
//! Remote locations go through [`retry::send_text`] so every request gets
//! exponential backoff on transient failures; local locations are read
//! straight from disk.

pub mod retry;

use std::path::PathBuf;

use thiserror::Error;

/// Browser-like User-Agent; some `ArcGIS` front ends reject bare clients.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; CovidMap/1.0)";

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-retryable or exhausted HTTP status.
    #[error("Request failed: {message}")]
    Status {
        /// Description of what went wrong.
        message: String,
    },
}

/// Where a resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Remote resource fetched over HTTP(S).
    Remote(String),
    /// File on the local filesystem.
    Local(PathBuf),
}

impl Location {
    /// Classifies a location string.
    #[must_use]
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Remote(trimmed.to_string())
        } else {
            Self::Local(PathBuf::from(
                trimmed.strip_prefix("file://").unwrap_or(trimmed),
            ))
        }
    }
}

/// Builds the shared `reqwest::Client` used by every fetcher.
///
/// # Errors
///
/// Returns [`FetchError`] if the client cannot be built.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Fetches the resource at `location` as text.
///
/// # Errors
///
/// Returns [`FetchError`] if the remote request fails after all retries
/// or the local file cannot be read.
pub async fn fetch_text(client: &reqwest::Client, location: &str) -> Result<String, FetchError> {
    match Location::parse(location) {
        Location::Remote(url) => {
            log::debug!("Fetching {url}");
            retry::send_text(|| client.get(&url)).await
        }
        Location::Local(path) => {
            log::debug!("Reading {}", path.display());
            Ok(tokio::fs::read_to_string(&path).await?)
        }
    }
}

/// Fetches the resource at `location` and parses it as JSON.
///
/// # Errors
///
/// Returns [`FetchError`] if retrieval fails or the body is not valid
/// JSON.
pub async fn fetch_json(
    client: &reqwest::Client,
    location: &str,
) -> Result<serde_json::Value, FetchError> {
    match Location::parse(location) {
        Location::Remote(url) => retry::send_json(|| client.get(&url)).await,
        Location::Local(path) => {
            let body = tokio::fs::read_to_string(&path).await?;
            Ok(serde_json::from_str(&body)?)
        }
    }
}
