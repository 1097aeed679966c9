//! Shift command builder.
//!
//! Converts an anchor offset into a single FFmpeg command that trims, pads
//! or just normalizes the moving recording.
//!
//! # Architecture
//!
//! - **plan_builder**: decides trim/pad/passthrough from the offset and direction
//! - **command**: renders the FFmpeg command, writes it out, optionally runs it

mod command;
mod plan_builder;

pub use command::{apply_shift, write_command_file, FfmpegCommand};
pub use plan_builder::{
    build_shift_plan, ShiftDirection, ShiftInstruction, ShiftPlan, ShiftRequest,
    EXTERNAL_ALIGNED_NAME, INHOUSE_ALIGNED_NAME,
};

/// Error types for building and applying shifts.
#[derive(Debug, thiserror::Error)]
pub enum ShiftError {
    /// Direction string is not one of the two known values.
    #[error("mode must be external_to_inhouse or inhouse_to_external, got '{0}'")]
    InvalidDirection(String),

    /// FFmpeg could not be started.
    #[error("Failed to start ffmpeg: {0}")]
    Spawn(String),

    /// FFmpeg ran and exited non-zero.
    #[error("FFmpeg returned non-zero exit code: {exit_code}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// IO error writing the command file or creating directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
