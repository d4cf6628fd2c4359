use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, AppResult};

const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Shared outbound client. Every provider call inherits `timeout`.
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))
}

/// Percent-encodes each segment of a repository path, keeping the `/` separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-encodes a caller-supplied identifier as a single path segment.
pub fn encode_segment(segment: &str) -> AppResult<String> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(AppError::InvalidInput(format!(
            "'{segment}' is not a valid identifier"
        )));
    }
    Ok(urlencoding::encode(segment).into_owned())
}

/// Response body for error messages; never fails.
pub async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unable to read response>".to_string())
}
