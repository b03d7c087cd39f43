//! Base64 transport encoding for image files.
//!
//! Pure and stateless: the only side effect is the file read in
//! [`encode`]. No size limit is enforced here; an oversized payload is the
//! endpoint's to reject.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{RecreateError, Result};
use crate::request::ImageRef;

/// The transport-encoded content of one input image, together with the
/// literal media type string used in the outbound part. Consumed once by
/// the payload builder and not retained after the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

/// Reads the file behind `image` fully and base64-encodes it.
pub fn encode(image: &ImageRef) -> Result<EncodedImage> {
    if !image.path.is_file() {
        return Err(RecreateError::FileNotFound {
            path: image.path.clone(),
        });
    }
    let bytes = fs::read(&image.path).map_err(|source| RecreateError::ReadError {
        path: image.path.clone(),
        source,
    })?;
    Ok(EncodedImage {
        data: STANDARD.encode(bytes),
        mime_type: image.mime_type.to_string(),
    })
}

/// Decodes transport-encoded data back to raw bytes. Invalid padding or
/// alphabet surfaces as `MalformedEncoding`.
pub fn decode(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(RecreateError::from)
}
