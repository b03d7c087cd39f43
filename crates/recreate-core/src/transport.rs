//! HTTP transport to the generation endpoint.
//!
//! One POST per call, no retry. The credential travels in the
//! `x-goog-api-key` header only, never in the body or query string, and is
//! never logged.

use std::time::Duration;

use serde_json::Value;

use crate::error::{RecreateError, Result};
use crate::payload::Payload;

/// The fixed production endpoint of the image recreation model.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to reach the endpoint. The endpoint URL is overridable so
/// front ends and tests can point at a local server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        ApiConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A structurally valid success body, kept both parsed and raw. The shape
/// is externally controlled and only partially trusted; navigation happens
/// in the extractor with named failures per missing field.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    pub raw: String,
}

/// Sends the payload and classifies the outcome.
///
/// - transport-level failures (connect, DNS, timeout) -> `NetworkError`,
///   with `timeout` set when the deadline was hit;
/// - HTTP 401/403 -> `AuthError`, so callers can prompt for a new key;
/// - any other non-success status -> `HttpError` with the body captured
///   for diagnostics;
/// - a success body that is not valid JSON -> `NetworkError` (the exchange
///   did not complete usefully).
pub fn send(config: &ApiConfig, payload: &Payload) -> Result<ApiResponse> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| RecreateError::NetworkError {
            timeout: false,
            detail: e.to_string(),
        })?;

    let response = client
        .post(&config.endpoint)
        .header("x-goog-api-key", &config.api_key)
        .header("Content-Type", "application/json")
        .json(payload)
        .send()
        .map_err(|e| RecreateError::NetworkError {
            timeout: e.is_timeout(),
            detail: e.to_string(),
        })?;

    let status = response.status();
    let raw = response.text().map_err(|e| RecreateError::NetworkError {
        timeout: e.is_timeout(),
        detail: e.to_string(),
    })?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(RecreateError::AuthError {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(RecreateError::HttpError {
            status: status.as_u16(),
            body: raw,
        });
    }

    let body: Value = serde_json::from_str(&raw).map_err(|e| RecreateError::NetworkError {
        timeout: false,
        detail: format!("response was not valid JSON: {}", e),
    })?;

    Ok(ApiResponse { body, raw })
}
