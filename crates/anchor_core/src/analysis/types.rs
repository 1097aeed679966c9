//! Core types for first-anchor analysis.

use serde::{Deserialize, Serialize};

/// Floor added to `|sample|` before taking the log for the amplitude gate.
pub const LEVEL_EPSILON: f64 = 1e-12;

/// Floor added to correlation and cosine-similarity denominators.
pub const NORM_EPSILON: f64 = 1e-12;

/// Offsets with magnitude at or below this are treated as zero.
pub const SIGN_DEAD_ZONE: f64 = 1e-6;

/// Mono audio at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Mono samples.
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Signal {
    /// Create a signal from samples.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the signal is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Borrow the samples from `start_secs` to the end.
    ///
    /// Non-positive starts return the whole signal; starts past the end
    /// return an empty slice.
    pub fn slice_from_secs(&self, start_secs: f64) -> &[f64] {
        if start_secs <= 0.0 {
            return &self.samples;
        }
        let start = (start_secs * self.sample_rate as f64) as usize;
        if start >= self.samples.len() {
            &[]
        } else {
            &self.samples[start..]
        }
    }
}

/// Where each stream's analysis window begins in its original recording.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StartOffsets {
    /// Analysis start of the reference (in-house) recording, seconds.
    pub reference_secs: f64,
    /// Analysis start of the target (external) recording, seconds.
    pub target_secs: f64,
}

/// Signed offset in seconds between the target and the reference.
///
/// Positive: the target must be delayed to line up with the reference.
/// Negative: the target must be advanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(f64);

impl Offset {
    /// No shift.
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Offset of `secs` seconds.
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Offset from the best cross-correlation lag.
    ///
    /// The lag is negated (a reference that leads shows up as a negative
    /// lag), then moved from analysis-window time to recording time.
    pub fn from_xcorr_lag(best_lag_samples: i64, sample_rate: u32, starts: StartOffsets) -> Self {
        let window_secs = if sample_rate == 0 {
            0.0
        } else {
            -(best_lag_samples as f64) / sample_rate as f64
        };
        Self::in_recording_time(window_secs, starts)
    }

    /// Offset from a content anchor found `anchor_secs` into the target window.
    ///
    /// Computed as `anchor_secs + (ref_start - target_start)`: positive means
    /// the external recording must be delayed, the same sign as
    /// [`Offset::from_xcorr_lag`]. This is the negation of the template
    /// position read literally (`ref_start - (anchor + target_start)`).
    /// Keeping one convention lets a content anchor and its xcorr fallback
    /// feed the same shift builder.
    ///
    /// The template is the head of the reference window, so a target that
    /// starts later shows up as a later anchor, exactly like a negated lag.
    pub fn from_content_anchor(anchor_secs: f64, starts: StartOffsets) -> Self {
        Self::in_recording_time(anchor_secs, starts)
    }

    fn in_recording_time(window_secs: f64, starts: StartOffsets) -> Self {
        Self(window_secs + (starts.reference_secs - starts.target_secs))
    }

    /// The offset in seconds.
    pub fn seconds(&self) -> f64 {
        self.0
    }

    /// The same offset seen from the other recording.
    pub fn inverted(&self) -> Self {
        Self(-self.0)
    }

    /// True when the offset sits inside the sign dead zone.
    pub fn is_negligible(&self) -> bool {
        self.0.abs() <= SIGN_DEAD_ZONE
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6} s", self.0)
    }
}

/// Similarity as a function of lag, kept for diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityCurve {
    /// Lag values in seconds.
    pub lags_secs: Vec<f64>,
    /// Normalized score per lag.
    pub scores: Vec<f64>,
}

impl SimilarityCurve {
    /// Single-point curve returned for empty inputs.
    pub fn degenerate() -> Self {
        Self {
            lags_secs: vec![0.0],
            scores: vec![1.0],
        }
    }

    /// Two-point stand-in used when the content search found the anchor.
    pub fn placeholder() -> Self {
        Self {
            lags_secs: vec![0.0, 1.0],
            scores: vec![1.0, 1.0],
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.lags_secs.len()
    }

    /// Check if the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.lags_secs.is_empty()
    }

    /// Keep every `step`-th point so that at most `max_points` remain.
    pub fn downsampled(&self, max_points: usize) -> SimilarityCurve {
        if max_points == 0 || self.len() <= max_points {
            return self.clone();
        }
        let step = self.len().div_ceil(max_points);
        SimilarityCurve {
            lags_secs: self.lags_secs.iter().step_by(step).copied().collect(),
            scores: self.scores.iter().step_by(step).copied().collect(),
        }
    }
}

/// Error types for decoding and analysis I/O.
///
/// Numeric edge cases inside the estimators never produce these.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// FFmpeg execution failed.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Source file not found.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
