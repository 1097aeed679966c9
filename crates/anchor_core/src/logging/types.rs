//! Log levels, per-job log configuration and message prefixes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Log level, both for the global filter and for per-job logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Configuration of a job's `align.log`.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level kept.
    pub level: LogLevel,
    /// Keep FFmpeg stderr in the tail only.
    pub compact: bool,
    /// FFmpeg stderr lines kept for a failed apply.
    pub error_tail: usize,
    /// Prefix file lines with the wall-clock time.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessagePrefix {
    /// `$ ffmpeg ...`
    Command,
    /// `=== Stage ===`
    Phase,
    Success,
    Warning,
    Error,
}

impl MessagePrefix {
    pub(crate) fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {}", message),
            MessagePrefix::Phase => format!("=== {} ===", message),
            MessagePrefix::Success => format!("[SUCCESS] {}", message),
            MessagePrefix::Warning => format!("[WARN] {}", message),
            MessagePrefix::Error => format!("[ERROR] {}", message),
        }
    }
}
