//! Orchestration of a single recreation run.
//!
//! A run walks the stages Encoding -> Sending -> AwaitingResponse ->
//! Extracting -> Persisting on one dedicated background thread, reporting
//! stage entries and progress over a channel that the caller drains on its
//! own thread. Cancellation is cooperative: a shared flag read at stage
//! boundaries, never mid-I/O.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::codec::{self, EncodedImage};
use crate::error::{RecreateError, Result};
use crate::extract;
use crate::payload;
use crate::request::RequestSpec;
use crate::transport::{self, ApiConfig};

/// The current step of a run, reported to observers before the step's work
/// begins so progress display is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Encoding,
    Sending,
    AwaitingResponse,
    Extracting,
    Persisting,
    Completed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Encoding => "encoding images",
            Stage::Sending => "building request",
            Stage::AwaitingResponse => "awaiting response",
            Stage::Extracting => "extracting image",
            Stage::Persisting => "writing output",
            Stage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Observer updates delivered over the run's channel.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Stage(Stage),
    /// Coarse progress fraction in 0.0..=1.0.
    Progress(f32),
    Completed(PathBuf),
    Failed { kind: &'static str, detail: String },
    Cancelled,
}

/// Terminal result of a run, returned by [`RunHandle::wait`].
#[derive(Debug)]
pub enum RunOutcome {
    Completed(PathBuf),
    Cancelled,
    Failed(RecreateError),
}

/// A cancellable, observable run started by [`Pipeline::start`].
#[derive(Debug)]
pub struct RunHandle {
    events: Receiver<PipelineEvent>,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// The event stream for this run. Drain it on your own thread; events
    /// stop after a terminal one.
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Requests cooperative cancellation. Honored at the next stage
    /// boundary; a write already in progress is not rolled back.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Blocks until the run reaches a terminal state.
    pub fn wait(self) -> RunOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// The recreation pipeline. Holds the endpoint configuration and runs at
/// most one request at a time; a second `start` while a run is active
/// fails fast with `Busy` instead of interleaving state.
pub struct Pipeline {
    config: ApiConfig,
    active: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: ApiConfig) -> Self {
        Pipeline {
            config,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Validates the spec and launches the run on a background thread.
    ///
    /// An invalid spec fails here, before any execution. Once the returned
    /// run reaches a terminal state this instance can start a new one.
    pub fn start(&self, spec: RequestSpec, output_path: PathBuf) -> Result<RunHandle> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(RecreateError::Busy);
        }
        if let Err(e) = spec.validate() {
            self.active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let config = self.config.clone();
        let run_cancel = Arc::clone(&cancel);
        let active = Arc::clone(&self.active);

        let handle = thread::spawn(move || {
            let _guard = ActiveGuard(active);
            run(&spec, &output_path, &config, &run_cancel, &tx)
        });

        Ok(RunHandle {
            events: rx,
            cancel,
            handle,
        })
    }
}

/// Clears the pipeline's active flag when the run thread ends, including
/// on panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn fail(events: &Sender<PipelineEvent>, err: RecreateError) -> RunOutcome {
    let _ = events.send(PipelineEvent::Failed {
        kind: err.kind(),
        detail: err.to_string(),
    });
    RunOutcome::Failed(err)
}

fn cancelled(events: &Sender<PipelineEvent>) -> RunOutcome {
    let _ = events.send(PipelineEvent::Cancelled);
    RunOutcome::Cancelled
}

/// Executes the staged run. The cancellation flag is read at every stage
/// boundary; an in-flight network call or file write is never interrupted.
pub(crate) fn run(
    spec: &RequestSpec,
    output_path: &Path,
    config: &ApiConfig,
    cancel: &AtomicBool,
    events: &Sender<PipelineEvent>,
) -> RunOutcome {
    let stage = |s: Stage, fraction: f32| {
        let _ = events.send(PipelineEvent::Stage(s));
        let _ = events.send(PipelineEvent::Progress(fraction));
    };

    if cancel.load(Ordering::SeqCst) {
        return cancelled(events);
    }
    stage(Stage::Encoding, 0.2);
    let primary = match codec::encode(&spec.primary) {
        Ok(encoded) => encoded,
        Err(e) => return fail(events, e),
    };
    let mut references: Vec<EncodedImage> = Vec::with_capacity(spec.references.len());
    for reference in &spec.references {
        match codec::encode(reference) {
            Ok(encoded) => references.push(encoded),
            Err(e) => return fail(events, e),
        }
    }

    if cancel.load(Ordering::SeqCst) {
        return cancelled(events);
    }
    stage(Stage::Sending, 0.4);
    let payload = payload::build(spec, primary, references);

    stage(Stage::AwaitingResponse, 0.5);
    let response = match transport::send(config, &payload) {
        Ok(response) => response,
        Err(e) => return fail(events, e),
    };

    if cancel.load(Ordering::SeqCst) {
        return cancelled(events);
    }
    stage(Stage::Extracting, 0.7);
    let bytes = match extract::extract(&response) {
        Ok(bytes) => bytes,
        Err(e) => return fail(events, e),
    };

    if cancel.load(Ordering::SeqCst) {
        return cancelled(events);
    }
    stage(Stage::Persisting, 0.9);
    if let Err(e) = fs::write(output_path, &bytes) {
        return fail(
            events,
            RecreateError::WriteError {
                path: output_path.to_path_buf(),
                detail: e.to_string(),
            },
        );
    }
    // A zero-byte result indicates a corrupted transfer even though the
    // write call itself succeeded.
    let written = fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return fail(
            events,
            RecreateError::WriteError {
                path: output_path.to_path_buf(),
                detail: "output file is empty".to_string(),
            },
        );
    }

    stage(Stage::Completed, 1.0);
    let _ = events.send(PipelineEvent::Completed(output_path.to_path_buf()));
    RunOutcome::Completed(output_path.to_path_buf())
}
