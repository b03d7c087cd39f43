//! Outbound request body assembly.
//!
//! The part ordering is load-bearing: the service associates images
//! positionally with prior instructions in some deployments, so the order
//! is always prompt, primary image, then references in submission order.

use serde::Serialize;

use crate::codec::EncodedImage;
use crate::request::RequestSpec;

/// One fragment of the request body: plain text or inline binary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: InlineData },
}

/// Embedded binary data tagged with its media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

/// The complete request body, built fresh per request and never mutated
/// after construction. Serializes to the `generateContent` wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    contents: Vec<Content>,
}

impl Payload {
    /// The ordered part sequence, for inspection and tests.
    pub fn parts(&self) -> &[Part] {
        &self.contents[0].parts
    }
}

/// Assembles the body from the prompt and the encoded images. Deterministic
/// and infallible: validation already happened on the spec.
pub fn build(spec: &RequestSpec, primary: EncodedImage, references: Vec<EncodedImage>) -> Payload {
    let mut parts = Vec::with_capacity(2 + references.len());
    parts.push(Part::Text {
        text: spec.prompt.clone(),
    });
    for encoded in std::iter::once(primary).chain(references) {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: encoded.mime_type,
                data: encoded.data,
            },
        });
    }
    Payload {
        contents: vec![Content { parts }],
    }
}
