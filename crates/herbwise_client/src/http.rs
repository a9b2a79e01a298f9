//! crates/herbwise_client/src/http.rs
//!
//! Shared request plumbing for the REST adapters: base-url normalization and
//! the mapping from HTTP failures onto `PortError`.

use herbwise_core::ports::PortError;
use reqwest::{Response, StatusCode};

pub(crate) fn trim_base(url: impl Into<String>) -> String {
    let mut base = url.into();
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Failures on the way to the server: DNS, connect, timeout, broken body.
pub(crate) fn transport(err: reqwest::Error) -> PortError {
    PortError::Network(err.to_string())
}

/// The server answered, but not with the shape we expected.
pub(crate) fn decode(err: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("could not decode response: {err}"))
}

/// Folds a non-2xx response into a `PortError`, digging the human-readable
/// message out of whichever JSON shape the upstream used.
pub(crate) async fn error_from(response: Response) -> PortError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.clone()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        status if status.is_server_error() => PortError::Unexpected(message),
        _ => PortError::Rejected(message),
    }
}
