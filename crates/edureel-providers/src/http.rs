//! Shared HTTP plumbing for the service clients.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{ProviderError, ProviderErrorKind, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Longest response body quoted back in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Builds the HTTP client shared by all service clients.
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| {
            ProviderError::api(
                "http",
                ProviderErrorKind::Other,
                format!("failed to create HTTP client: {e}"),
            )
        })
}

/// Maps a transport-level `reqwest` error onto a [`ProviderError`].
pub(crate) fn map_http_error(service: &str, error: &reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        ProviderError::api(
            service,
            ProviderErrorKind::from_status(status.as_u16()),
            format!("request failed with status {status}: {error}"),
        )
    } else if error.is_timeout() {
        ProviderError::api(service, ProviderErrorKind::Network, format!("request timeout: {error}"))
    } else if error.is_connect() {
        ProviderError::api(
            service,
            ProviderErrorKind::Network,
            format!("connection error: {error}"),
        )
    } else if error.is_decode() {
        ProviderError::invalid_response(service, error.to_string())
    } else {
        ProviderError::api(service, ProviderErrorKind::Other, format!("HTTP error: {error}"))
    }
}

/// Passes successful responses through and turns error statuses into
/// [`ProviderError::Api`], quoting the (truncated) response body.
pub(crate) async fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::api(
        service,
        ProviderErrorKind::from_status(status.as_u16()),
        format!("status {status}: {}", truncate(&body, MAX_ERROR_BODY)),
    ))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
