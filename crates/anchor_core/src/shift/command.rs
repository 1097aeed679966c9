//! FFmpeg shift command: argument vector, display form and execution.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::plan_builder::ShiftInstruction;
use super::ShiftError;

const PROGRAM: &str = "ffmpeg";

/// One FFmpeg invocation that shifts and normalizes a single file.
///
/// The output is always mono, resampled to `sample_rate`, 16-bit PCM in a
/// WAV container that switches to RF64 when needed.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    sample_rate: u32,
    instruction: ShiftInstruction,
}

impl FfmpegCommand {
    /// Create the command for one instruction.
    pub fn new(
        input: PathBuf,
        output: PathBuf,
        sample_rate: u32,
        instruction: ShiftInstruction,
    ) -> Self {
        Self {
            input,
            output,
            sample_rate,
            instruction,
        }
    }

    /// Program name.
    pub fn program(&self) -> &str {
        PROGRAM
    }

    /// File being read.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// File being written.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Argument vector passed to the process, without shell quoting.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.display().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
        ];

        match self.instruction {
            ShiftInstruction::Trim { seconds } => {
                args.push("-ss".to_string());
                args.push(format_seconds(seconds));
            }
            ShiftInstruction::Pad { milliseconds } => {
                args.push("-af".to_string());
                args.push(adelay_filter(milliseconds));
            }
            ShiftInstruction::Passthrough => {}
        }

        args.extend(
            ["-c:a", "pcm_s16le", "-rf64", "always"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(self.output.display().to_string());
        args
    }
}

impl std::fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -y -i \"{}\" -ac 1 -ar {} ",
            PROGRAM,
            self.input.display(),
            self.sample_rate
        )?;
        match self.instruction {
            ShiftInstruction::Trim { seconds } => write!(f, "-ss {} ", format_seconds(seconds))?,
            ShiftInstruction::Pad { milliseconds } => {
                write!(f, "-af \"{}\" ", adelay_filter(milliseconds))?
            }
            ShiftInstruction::Passthrough => {}
        }
        write!(
            f,
            "-c:a pcm_s16le -rf64 always \"{}\"",
            self.output.display()
        )
    }
}

/// Seconds with six decimals, clamped at zero.
fn format_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds.max(0.0))
}

/// Same delay on both channels; FFmpeg ignores the extra one for mono.
fn adelay_filter(milliseconds: u64) -> String {
    format!("adelay={}|{}", milliseconds, milliseconds)
}

/// Run the command directly (no shell). No retries.
///
/// A non-zero exit is returned as `CommandFailed` carrying the captured
/// stderr; files already written by earlier steps are left in place.
pub fn apply_shift(command: &FfmpegCommand) -> Result<(), ShiftError> {
    if let Some(parent) = command.output().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!("Applying alignment: {}", command);

    let output = Command::new(command.program())
        .args(command.args())
        .output()
        .map_err(|e| ShiftError::Spawn(e.to_string()))?;

    if !output.status.success() {
        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::warn!("ffmpeg exited with code {}", exit_code);
        return Err(ShiftError::CommandFailed { exit_code, stderr });
    }

    tracing::info!("Alignment written to {}", command.output().display());
    Ok(())
}

/// Write the command text, followed by a newline, to `path`.
pub fn write_command_file(path: &Path, command: &FfmpegCommand) -> Result<(), ShiftError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, format!("{}\n", command))?;
    tracing::info!("Wrote alignment command to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn command(instruction: ShiftInstruction) -> FfmpegCommand {
        FfmpegCommand::new(
            PathBuf::from("/media/ext.wav"),
            PathBuf::from("external_aligned.wav"),
            48000,
            instruction,
        )
    }

    #[test]
    fn renders_pad_command() {
        let cmd = command(ShiftInstruction::Pad { milliseconds: 50 });
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -y -i \"/media/ext.wav\" -ac 1 -ar 48000 -af \"adelay=50|50\" \
             -c:a pcm_s16le -rf64 always \"external_aligned.wav\""
        );
    }

    #[test]
    fn renders_trim_command_with_six_decimals() {
        let cmd = command(ShiftInstruction::Trim { seconds: 1.5 });
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -y -i \"/media/ext.wav\" -ac 1 -ar 48000 -ss 1.500000 \
             -c:a pcm_s16le -rf64 always \"external_aligned.wav\""
        );
    }

    #[test]
    fn renders_passthrough_command() {
        let cmd = command(ShiftInstruction::Passthrough);
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -y -i \"/media/ext.wav\" -ac 1 -ar 48000 \
             -c:a pcm_s16le -rf64 always \"external_aligned.wav\""
        );
    }

    #[test]
    fn args_match_display_without_quotes() {
        for instruction in [
            ShiftInstruction::Trim { seconds: 0.25 },
            ShiftInstruction::Pad { milliseconds: 120 },
            ShiftInstruction::Passthrough,
        ] {
            let cmd = command(instruction);
            let joined = format!("{} {}", cmd.program(), cmd.args().join(" "));
            assert_eq!(joined, cmd.to_string().replace('"', ""));
        }
    }

    #[test]
    fn paths_with_spaces_stay_single_arguments() {
        let cmd = FfmpegCommand::new(
            PathBuf::from("/media/my take.wav"),
            PathBuf::from("out dir/aligned.wav"),
            44100,
            ShiftInstruction::Passthrough,
        );
        let args = cmd.args();
        assert!(args.contains(&"/media/my take.wav".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out dir/aligned.wav"));
    }

    #[test]
    fn command_file_ends_with_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("aligned_cmd.txt");
        let cmd = command(ShiftInstruction::Pad { milliseconds: 7 });

        write_command_file(&path, &cmd).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, format!("{}\n", cmd));
    }
}
