//! Shift plan builder.
//!
//! Turns a signed offset and a "which file moves" direction into one of
//! trim, pad or passthrough, and resolves the paths involved. Nothing here
//! touches the filesystem or spawns a process.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::Offset;

use super::command::FfmpegCommand;
use super::ShiftError;

/// Default output name when the external recording moves.
pub const EXTERNAL_ALIGNED_NAME: &str = "external_aligned.wav";

/// Default output name when the in-house recording moves.
pub const INHOUSE_ALIGNED_NAME: &str = "inhouse_aligned.wav";

/// Which recording is shifted onto the other's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    /// Move the external recording to match the in-house one.
    #[default]
    ExternalToInhouse,
    /// Move the in-house recording to match the external one.
    InhouseToExternal,
}

impl ShiftDirection {
    /// Name as accepted on the command line and in job parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftDirection::ExternalToInhouse => "external_to_inhouse",
            ShiftDirection::InhouseToExternal => "inhouse_to_external",
        }
    }
}

impl std::fmt::Display for ShiftDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftDirection {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_to_inhouse" => Ok(ShiftDirection::ExternalToInhouse),
            "inhouse_to_external" => Ok(ShiftDirection::InhouseToExternal),
            other => Err(ShiftError::InvalidDirection(other.to_string())),
        }
    }
}

/// The single timing adjustment applied to the moving file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShiftInstruction {
    /// Cut this many seconds from the head (advance).
    Trim { seconds: f64 },
    /// Insert this many milliseconds of leading silence (delay).
    Pad { milliseconds: u64 },
    /// No timing change; format normalization only.
    Passthrough,
}

impl ShiftInstruction {
    /// Pick the instruction for an effective offset.
    ///
    /// Offsets inside the dead zone are a passthrough. Pad lengths round
    /// half to even.
    pub fn for_offset(effective: Offset) -> Self {
        let secs = effective.seconds();
        if effective.is_negligible() {
            ShiftInstruction::Passthrough
        } else if secs < 0.0 {
            ShiftInstruction::Trim { seconds: secs.abs() }
        } else {
            ShiftInstruction::Pad {
                milliseconds: (secs * 1000.0).round_ties_even() as u64,
            }
        }
    }

    /// Short label for logs and job results.
    pub fn label(&self) -> &'static str {
        match self {
            ShiftInstruction::Trim { .. } => "trim",
            ShiftInstruction::Pad { .. } => "pad",
            ShiftInstruction::Passthrough => "passthrough",
        }
    }
}

/// Everything needed to decide a shift.
#[derive(Debug, Clone)]
pub struct ShiftRequest {
    /// In-house (reference) recording.
    pub inhouse_path: PathBuf,
    /// External (target) recording.
    pub external_path: PathBuf,
    /// Output sample rate.
    pub sample_rate: u32,
    /// Which file moves.
    pub direction: ShiftDirection,
    /// Offset of the external recording relative to the in-house one.
    pub offset: Offset,
    /// Advisory only; trim/pad follows the sign of the effective offset.
    pub prefer_trim: bool,
    /// Output path override.
    pub output_path: Option<PathBuf>,
}

/// The decided shift, ready to be written out or applied.
#[derive(Debug, Clone)]
pub struct ShiftPlan {
    /// Timing adjustment.
    pub instruction: ShiftInstruction,
    /// File being shifted.
    pub moving_path: PathBuf,
    /// Where the shifted audio is written.
    pub output_path: PathBuf,
    /// Offset after direction inversion.
    pub effective_offset: Offset,
    /// Command that performs the shift.
    pub command: FfmpegCommand,
}

/// Build the shift plan for a request.
pub fn build_shift_plan(request: &ShiftRequest) -> ShiftPlan {
    let (moving_path, effective_offset, default_name) = match request.direction {
        ShiftDirection::ExternalToInhouse => (
            request.external_path.clone(),
            request.offset,
            EXTERNAL_ALIGNED_NAME,
        ),
        ShiftDirection::InhouseToExternal => (
            request.inhouse_path.clone(),
            request.offset.inverted(),
            INHOUSE_ALIGNED_NAME,
        ),
    };

    let output_path = request
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_name));

    let instruction = ShiftInstruction::for_offset(effective_offset);

    if request.prefer_trim {
        tracing::debug!(
            "prefer_trim is advisory; using {} from the offset sign",
            instruction.label()
        );
    }

    let command = FfmpegCommand::new(
        moving_path.clone(),
        output_path.clone(),
        request.sample_rate,
        instruction,
    );

    tracing::debug!(
        "Shift plan: {} {} (effective offset {})",
        instruction.label(),
        moving_path.display(),
        effective_offset
    );

    ShiftPlan {
        instruction,
        moving_path,
        output_path,
        effective_offset,
        command,
    }
}
