//! HTTP retry helpers for transient errors.
//!
//! Every remote request made by the boundary and case loaders goes through
//! [`send_text`] or [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so timeouts, connection
//! resets, HTTP 429 and HTTP 5xx responses are retried with exponential
//! backoff.
//!
//! ```ignore
//! let body = retry::send_text(|| client.get(&url)).await?;
//! let json = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::FetchError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s) the total wait before
/// giving up is 30 seconds.
const MAX_RETRIES: u32 = 4;

/// Maximum number of full re-fetch attempts when the body arrives but
/// cannot be read or decoded.
const MAX_BODY_RETRIES: u32 = 2;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;

    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;
        let url = response.url().to_string();
        let status = response.status();

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = Duration::from_secs(1u64 << body_attempt);
                log::warn!(
                    "Body read failed (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}...\n  url: {url}\n  status: {status}\n  error: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!(
                    "Body read failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                     url: {url}\n  status: {status}\n  error: {e}"
                );
                return Err(FetchError::Http(e));
            }
        }
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// A body that arrives but does not parse (truncated or garbled
/// response) triggers a full re-fetch, up to [`MAX_BODY_RETRIES`] times.
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails after all retries or the
/// body still cannot be parsed as JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;

    loop {
        let text = send_text(&build_request).await?;

        match serde_json::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(e) if body_attempt < MAX_BODY_RETRIES => {
                body_attempt += 1;
                let delay = Duration::from_secs(1u64 << body_attempt);
                log::warn!(
                    "JSON parse failed (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}...\n  parse error: {e}\n  body preview: {}",
                    preview(&text)
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!(
                    "JSON parse failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                     received: {} bytes\n  body preview: {}",
                    text.len(),
                    preview(&text)
                );
                return Err(FetchError::Json(e));
            }
        }
    }
}

/// Core retry loop shared by [`send_text`] and [`send_json`].
///
/// Returns the first response with a 2xx or 3xx status.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<FetchError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(FetchError::Http(e));
                    continue;
                }
                return Err(FetchError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        last_error = Some(FetchError::Status {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(FetchError::Status {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                // 4xx other than 429 is permanent
                if status.is_client_error() {
                    return Err(FetchError::Status {
                        message: format!("HTTP {status} from {}", response.url()),
                    });
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| FetchError::Status {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Truncates a body for logging, appending "..." past the preview length.
fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
