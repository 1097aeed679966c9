//! Job records and alignment outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnchorSource;
use crate::shift::ShiftInstruction;

use super::params::AlignmentParameters;

/// Lifecycle of a queued alignment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Submitted, not yet picked up.
    #[default]
    Queued,
    /// Being processed.
    Running,
    /// Finished; `result` is set.
    Completed,
    /// Failed; `error` is set.
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Everything one alignment run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOutcome {
    /// Offset of the external recording relative to the in-house one (seconds).
    pub offset_sec: f64,
    /// Method that produced the offset.
    pub anchor_source: AnchorSource,
    /// Instruction applied to the moving file.
    pub instruction: ShiftInstruction,
    /// Rendered FFmpeg command.
    pub ffmpeg_command: String,
    /// In-house input used.
    pub inhouse_path: PathBuf,
    /// External input used.
    pub external_path: PathBuf,
    /// Shifted audio, when the command was applied successfully.
    #[serde(default)]
    pub aligned_audio_path: Option<PathBuf>,
    /// Waveform overlay, when rendered.
    #[serde(default)]
    pub waveform_png_path: Option<PathBuf>,
    /// Similarity curve, when rendered.
    #[serde(default)]
    pub similarity_png_path: Option<PathBuf>,
    /// Default-view spectrograms that rendered.
    #[serde(default)]
    pub spectrogram_paths: Vec<PathBuf>,
    /// Exit code of the applied command, when it was run.
    #[serde(default)]
    pub apply_exit_code: Option<i32>,
    /// Log lines of the run.
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Persisted state of one job (`jobs/<job_id>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier (UUID v4).
    pub job_id: String,
    /// Current status.
    pub status: JobStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Explicit raw-audio deadline; retention derives one when absent.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether uploads still hold the raw inputs.
    #[serde(default = "default_true")]
    pub has_raw_audio: bool,
    /// Pinned jobs are never purged.
    #[serde(default)]
    pub pinned: bool,
    /// Uploaded in-house input.
    pub inhouse_path: PathBuf,
    /// Uploaded external input.
    pub external_path: PathBuf,
    /// Parameters of the run.
    #[serde(default)]
    pub params: AlignmentParameters,
    /// Outcome, once completed.
    #[serde(default)]
    pub result: Option<AlignmentOutcome>,
    /// Error message, once failed.
    #[serde(default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl JobRecord {
    /// New queued record.
    pub fn queued(
        job_id: impl Into<String>,
        inhouse_path: PathBuf,
        external_path: PathBuf,
        params: AlignmentParameters,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            expires_at: None,
            has_raw_audio: true,
            pinned: false,
            inhouse_path,
            external_path,
            params,
            result: None,
            error: None,
        }
    }

    /// True once the job reached `Completed` or `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}
