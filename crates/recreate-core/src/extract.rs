//! Locates and decodes the first inline image in a generation response.

use serde_json::Value;

use crate::codec;
use crate::error::{RecreateError, Result};
use crate::transport::ApiResponse;

/// Walks the nested response for the recreated image.
///
/// Takes the first candidate (`NoCandidate` if the list is absent or
/// empty), then scans its parts in order and decodes the first inline-data
/// part found, wherever it sits among text parts. A candidate with only
/// text parts is `NoImagePart` - a legitimate outcome when the service
/// declines - and carries the raw body so the caller can display it.
/// Invalid base64 in an offered image is `MalformedEncoding`, distinct
/// from `NoImagePart`, so "no image offered" and "image offered but
/// corrupt" stay tellable apart. When several inline parts are present the
/// first one is the result; later parts are not alternates to merge.
pub fn extract(response: &ApiResponse) -> Result<Vec<u8>> {
    let candidate = response
        .body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or(RecreateError::NoCandidate)?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array);

    if let Some(parts) = parts {
        for part in parts {
            if let Some(data) = part.pointer("/inlineData/data").and_then(Value::as_str) {
                return codec::decode(data);
            }
        }
    }

    Err(RecreateError::NoImagePart {
        body: response.raw.clone(),
    })
}
