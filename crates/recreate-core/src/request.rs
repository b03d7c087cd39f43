//! Request specification and invariant validation.

use std::path::{Path, PathBuf};

use crate::error::{RecreateError, Result};

/// Maximum number of reference images accepted per request.
pub const MAX_REFERENCES: usize = 2;

/// The single media kind this system submits and requests.
pub const JPEG_MIME: &str = "image/jpeg";

/// A caller-owned input image: a path plus its resolved media type.
/// Immutable once selected; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub mime_type: &'static str,
}

impl ImageRef {
    pub fn jpeg(path: impl Into<PathBuf>) -> Self {
        ImageRef {
            path: path.into(),
            mime_type: JPEG_MIME,
        }
    }
}

/// Everything the pipeline needs to issue one recreation request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub prompt: String,
    pub primary: ImageRef,
    pub references: Vec<ImageRef>,
}

impl RequestSpec {
    pub fn new(prompt: impl Into<String>, primary: ImageRef) -> Self {
        RequestSpec {
            prompt: prompt.into(),
            primary,
            references: Vec::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<ImageRef>) -> Self {
        self.references = references;
        self
    }

    /// Checks the spec invariants: non-empty prompt, at most
    /// [`MAX_REFERENCES`] references, and a primary path that resolves to a
    /// regular file. Reference paths are only checked later, during
    /// encoding, so a missing reference surfaces as `FileNotFound` with the
    /// offending path.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(RecreateError::InvalidSpec("prompt is empty".to_string()));
        }
        if self.references.len() > MAX_REFERENCES {
            return Err(RecreateError::InvalidSpec(format!(
                "at most {} reference images are supported, got {}",
                MAX_REFERENCES,
                self.references.len()
            )));
        }
        if !self.primary.path.is_file() {
            return Err(RecreateError::InvalidSpec(format!(
                "primary image is not a regular file: {}",
                self.primary.path.display()
            )));
        }
        Ok(())
    }

    /// All input paths in submission order: primary first, then references.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary.path.as_path())
            .chain(self.references.iter().map(|r| r.path.as_path()))
    }
}
