//! Alignment parameters shared by the CLI, the job store and the config file.

use serde::{Deserialize, Serialize};

use crate::analysis::{AnchorMode, AnchorParams, WindowConfig, DEFAULT_SAMPLE_RATE};
use crate::shift::{ShiftDirection, ShiftError};

/// Errors found when validating parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    /// Direction string is not recognized.
    #[error(transparent)]
    Direction(#[from] ShiftError),

    /// Anchor mode string is not recognized.
    #[error("{0}")]
    AnchorMode(String),

    /// Sample rate of zero.
    #[error("sample rate must be positive")]
    ZeroSampleRate,
}

/// Every knob of one alignment run.
///
/// Field names are the job JSON keys. `mode` and `anchor_mode` stay strings;
/// `validate()` parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParameters {
    /// Analysis/output sample rate.
    #[serde(default = "default_sr")]
    pub sr: u32,

    /// Which file moves: `external_to_inhouse` or `inhouse_to_external`.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// `xcorr` or `content`.
    #[serde(default = "default_anchor_mode")]
    pub anchor_mode: String,

    /// Accepted for compatibility; has no effect on trim/pad.
    #[serde(default)]
    pub prefer_trim: bool,

    /// Gate threshold in dBFS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_db: Option<f64>,

    /// Search radius (seconds).
    #[serde(default = "default_max_search")]
    pub max_search: f64,

    /// Analysis start in the in-house recording (seconds).
    #[serde(default)]
    pub ref_start_sec: f64,

    /// Analysis start in the external recording (seconds).
    #[serde(default)]
    pub search_start_sec: f64,

    /// Maximum in-house analysis length (seconds).
    #[serde(default = "default_analysis_sec")]
    pub analysis_sec: f64,

    /// Content template length (seconds).
    #[serde(default = "default_template_sec")]
    pub template_sec: f64,

    /// Content hop (seconds).
    #[serde(default = "default_hop_sec")]
    pub hop_sec: f64,

    /// Content similarity threshold.
    #[serde(default = "default_min_sim")]
    pub min_sim: f64,

    /// Write the raw waveform overlay PNG.
    #[serde(default = "default_true")]
    pub generate_waveform_png: bool,

    /// Write the similarity curve PNG.
    #[serde(default = "default_true")]
    pub generate_similarity_png: bool,

    /// Write the default-view spectrogram of each track.
    #[serde(default = "default_true")]
    pub generate_spectrograms: bool,

    /// Run the shift command after building it.
    #[serde(default)]
    pub apply: bool,
}

fn default_sr() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_mode() -> String {
    ShiftDirection::ExternalToInhouse.as_str().to_string()
}

fn default_anchor_mode() -> String {
    AnchorMode::Xcorr.to_string()
}

fn default_max_search() -> f64 {
    60.0
}

fn default_analysis_sec() -> f64 {
    30.0
}

fn default_template_sec() -> f64 {
    4.0
}

fn default_hop_sec() -> f64 {
    0.1
}

fn default_min_sim() -> f64 {
    0.78
}

fn default_true() -> bool {
    true
}

impl Default for AlignmentParameters {
    fn default() -> Self {
        Self {
            sr: default_sr(),
            mode: default_mode(),
            anchor_mode: default_anchor_mode(),
            prefer_trim: false,
            threshold_db: None,
            max_search: default_max_search(),
            ref_start_sec: 0.0,
            search_start_sec: 0.0,
            analysis_sec: default_analysis_sec(),
            template_sec: default_template_sec(),
            hop_sec: default_hop_sec(),
            min_sim: default_min_sim(),
            generate_waveform_png: true,
            generate_similarity_png: true,
            generate_spectrograms: true,
            apply: false,
        }
    }
}

impl AlignmentParameters {
    /// Check everything that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.sr == 0 {
            return Err(ParameterError::ZeroSampleRate);
        }
        self.direction()?;
        self.anchor_mode()?;
        Ok(())
    }

    /// Parsed shift direction.
    pub fn direction(&self) -> Result<ShiftDirection, ParameterError> {
        Ok(self.mode.parse::<ShiftDirection>()?)
    }

    /// Parsed anchor mode.
    pub fn anchor_mode(&self) -> Result<AnchorMode, ParameterError> {
        self.anchor_mode
            .parse::<AnchorMode>()
            .map_err(ParameterError::AnchorMode)
    }

    /// Window bounds for the analysis.
    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            ref_start_secs: self.ref_start_sec,
            target_start_secs: self.search_start_sec,
            gate_threshold_db: self.threshold_db,
            analysis_secs: self.analysis_sec,
            max_search_secs: self.max_search,
        }
    }

    /// Full anchor search parameters.
    pub fn anchor_params(&self) -> Result<AnchorParams, ParameterError> {
        Ok(AnchorParams {
            window: self.window_config(),
            mode: self.anchor_mode()?,
            template_secs: self.template_sec,
            hop_secs: self.hop_sec,
            min_similarity: self.min_sim,
        })
    }
}
