//! File-backed alignment jobs.
//!
//! This module provides:
//! - `MediaLayout`: where job records, uploads and results live under the media root
//! - `JobStore`: submit, inspect and process jobs (`jobs/<id>.json`), and
//!   render per-track spectrograms on request
//! - `run_alignment`: one complete alignment run writing into a results folder
//! - `purge`: retention of old jobs and raw uploads

mod layout;
mod retention;
mod runner;
mod store;

use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::diagnostics::{DiagnosticError, SpectrogramTrack};
use crate::models::{JobStatus, ParameterError};
use crate::shift::ShiftError;

pub use layout::MediaLayout;
pub use retention::{purge, PurgeAction, PurgeReport, RetentionPolicy};
pub use runner::{
    run_alignment, ALIGNED_AUDIO_NAME, COMMAND_FILE_NAME, SIMILARITY_PNG_NAME, WAVEFORM_PNG_NAME,
};
pub use store::JobStore;

/// Errors from job handling and alignment runs.
#[derive(Error, Debug)]
pub enum JobError {
    /// Parameters failed validation.
    #[error("Invalid parameters: {0}")]
    Parameters(#[from] ParameterError),

    /// Input file is missing.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Decoding or analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Command could not be written or started.
    #[error(transparent)]
    Shift(#[from] ShiftError),

    /// Plot could not be rendered.
    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),

    /// Job IDs are plain tokens: ASCII letters, digits, `-` and `_`.
    #[error("Invalid job ID: {0:?}")]
    InvalidId(String),

    /// No record for this job ID.
    #[error("Job '{0}' not found")]
    NotFound(String),

    /// The audio a spectrogram needs is gone (purged, or never produced).
    #[error("No {track} audio left for job '{job_id}'")]
    AudioMissing {
        job_id: String,
        track: SpectrogramTrack,
    },

    /// Only queued jobs can be processed.
    #[error("Job '{job_id}' is {status}, not queued")]
    NotQueued { job_id: String, status: JobStatus },

    /// Record could not be encoded or decoded.
    #[error("Invalid job record: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;
