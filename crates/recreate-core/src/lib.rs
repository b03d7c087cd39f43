//! Core library of the image recreation tool.
//!
//! Turns a set of local image files and a prompt into one request to the
//! remote generation endpoint, then retrieves and persists the resulting
//! image. Any front end (console, graphical, or headless) drives the same
//! [`pipeline::Pipeline`]: start a run, drain its events, wait for the
//! terminal outcome.

pub mod codec;
pub mod error;
pub mod extract;
pub mod payload;
pub mod pipeline;
pub mod request;
pub mod transport;

pub use error::{RecreateError, Result};
pub use pipeline::{Pipeline, PipelineEvent, RunHandle, RunOutcome, Stage};
pub use request::{ImageRef, RequestSpec, JPEG_MIME, MAX_REFERENCES};
pub use transport::{ApiConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
