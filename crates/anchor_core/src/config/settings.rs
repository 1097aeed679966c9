//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::AlignmentParameters;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Default alignment parameters for new runs.
    #[serde(default)]
    pub alignment: AlignmentParameters,

    /// Job retention.
    #[serde(default)]
    pub retention: RetentionSettings,
}

/// Media and log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root holding `jobs/`, `uploads/` and `results/`.
    #[serde(default = "default_media_root")]
    pub media_root: String,

    /// Folder for per-job and daily log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_media_root() -> String {
    "data".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when RUST_LOG is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep FFmpeg stderr out of job logs unless an apply fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// FFmpeg stderr lines written to a job log when an apply fails.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Also write a daily rolling log file into `logs_folder`.
    #[serde(default)]
    pub file_logging: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: default_error_tail(),
            file_logging: false,
        }
    }
}

impl LoggingSettings {
    /// Per-job logger configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            error_tail: self.error_tail.max(1) as usize,
            show_timestamps: true,
        }
    }
}

/// How long jobs and their raw uploads are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Whole jobs older than this are deleted.
    #[serde(default = "default_job_retention_days")]
    pub job_retention_days: u32,

    /// Raw uploads are deleted after this many days.
    #[serde(default = "default_raw_audio_only_days")]
    pub raw_audio_only_days: u32,
}

fn default_job_retention_days() -> u32 {
    90
}

fn default_raw_audio_only_days() -> u32 {
    30
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            job_retention_days: default_job_retention_days(),
            raw_audio_only_days: default_raw_audio_only_days(),
        }
    }
}

/// Environment variables that override file settings.
pub const ENV_MEDIA_ROOT: &str = "ALIGN_MEDIA_ROOT";
pub const ENV_JOB_RETENTION_DAYS: &str = "ALIGN_JOB_RETENTION_DAYS";
pub const ENV_RAW_AUDIO_ONLY_DAYS: &str = "ALIGN_RAW_AUDIO_ONLY_DAYS";

impl Settings {
    /// Apply `ALIGN_*` overrides using `lookup` to read variables.
    ///
    /// Unparsable numbers are ignored with a warning. Returns the names of
    /// the variables that were applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(root) = lookup(ENV_MEDIA_ROOT).filter(|v| !v.trim().is_empty()) {
            self.paths.media_root = root;
            applied.push(ENV_MEDIA_ROOT);
        }

        for (name, slot) in [
            (
                ENV_JOB_RETENTION_DAYS,
                &mut self.retention.job_retention_days,
            ),
            (
                ENV_RAW_AUDIO_ONLY_DAYS,
                &mut self.retention.raw_audio_only_days,
            ),
        ] {
            if let Some(raw) = lookup(name) {
                match raw.trim().parse::<u32>() {
                    Ok(days) => {
                        *slot = days;
                        applied.push(name);
                    }
                    Err(_) => tracing::warn!("Ignoring {}={:?}: not a day count", name, raw),
                }
            }
        }

        applied
    }
}

/// Config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Alignment,
    Retention,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Alignment => "alignment",
            ConfigSection::Retention => "retention",
        }
    }

    /// All sections in file order.
    pub fn all() -> [ConfigSection; 4] {
        [
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Alignment,
            ConfigSection::Retention,
        ]
    }
}
