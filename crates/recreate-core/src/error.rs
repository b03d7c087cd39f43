//! Failure taxonomy for the recreation pipeline.
//!
//! Every failure is terminal for the current run; retry policy belongs to
//! the caller. Each variant carries what a front end needs to render a
//! message without re-deriving it (status code, offending path, raw body).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecreateError>;

#[derive(Debug, Error)]
pub enum RecreateError {
    /// The request spec violated an invariant before any work started.
    #[error("invalid request: {0}")]
    InvalidSpec(String),

    /// An input path does not resolve to a regular file.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// An input file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The transport could not complete the exchange (connection, DNS,
    /// timeout, or an unusable response body).
    #[error("network error (timed out: {timeout}): {detail}")]
    NetworkError { timeout: bool, detail: String },

    /// The endpoint rejected the credential (HTTP 401/403).
    #[error("authentication rejected (HTTP {status}): check your API key")]
    AuthError { status: u16 },

    /// The endpoint responded with some other non-success status.
    #[error("API error (HTTP {status}): {body}")]
    HttpError { status: u16, body: String },

    /// The response parsed but its candidate list was absent or empty.
    #[error("response contained no candidates")]
    NoCandidate,

    /// The first candidate held only text parts. The service may simply
    /// have declined; the raw body is kept so the caller can show it.
    #[error("no image data found in response:\n{body}")]
    NoImagePart { body: String },

    /// Inline data was offered but is not valid base64.
    #[error("malformed base64 image data: {0}")]
    MalformedEncoding(#[from] base64::DecodeError),

    /// The output file could not be created or written, or came out empty.
    #[error("failed to write {path}: {detail}")]
    WriteError { path: PathBuf, detail: String },

    /// A run is already in progress on this pipeline instance.
    #[error("a recreation run is already in progress")]
    Busy,
}

impl RecreateError {
    /// Short stable name for the failure class, for logs and observers.
    pub fn kind(&self) -> &'static str {
        match self {
            RecreateError::InvalidSpec(_) => "InvalidSpec",
            RecreateError::FileNotFound { .. } => "FileNotFound",
            RecreateError::ReadError { .. } => "ReadError",
            RecreateError::NetworkError { .. } => "NetworkError",
            RecreateError::AuthError { .. } => "AuthError",
            RecreateError::HttpError { .. } => "HttpError",
            RecreateError::NoCandidate => "NoCandidate",
            RecreateError::NoImagePart { .. } => "NoImagePart",
            RecreateError::MalformedEncoding(_) => "MalformedEncoding",
            RecreateError::WriteError { .. } => "WriteError",
            RecreateError::Busy => "Busy",
        }
    }
}
