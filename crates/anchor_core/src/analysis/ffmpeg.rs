//! FFmpeg audio decoding.
//!
//! Decodes any input FFmpeg understands to mono, resampled to the analysis
//! rate, and reads back raw f64 samples over a pipe.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::analysis::types::{AnalysisError, AnalysisResult, Signal};

/// Default analysis/output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Load a file as mono f64 samples at `sample_rate`.
pub fn load_mono(input_path: &Path, sample_rate: u32) -> AnalysisResult<Signal> {
    if !input_path.is_file() {
        return Err(AnalysisError::SourceNotFound(
            input_path.display().to_string(),
        ));
    }

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-v")
        .arg("error")
        .arg("-i")
        .arg(input_path)
        .arg("-vn") // No video
        .arg("-ac")
        .arg("1") // Mono
        .arg("-ar")
        .arg(sample_rate.to_string())
        .arg("-f")
        .arg("f64le")
        .arg("-acodec")
        .arg("pcm_f64le")
        .arg("pipe:1");

    cmd.stderr(Stdio::null()).stdout(Stdio::piped());

    tracing::debug!("Running FFmpeg: {:?}", cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| AnalysisError::FfmpegError(format!("Failed to spawn FFmpeg: {}", e)))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| AnalysisError::FfmpegError("Failed to capture FFmpeg stdout".to_string()))?;

    let mut buffer = Vec::new();
    stdout.read_to_end(&mut buffer).map_err(|e| {
        AnalysisError::FfmpegError(format!("Failed to read FFmpeg output: {}", e))
    })?;

    let status = child
        .wait()
        .map_err(|e| AnalysisError::FfmpegError(format!("FFmpeg process error: {}", e)))?;

    if !status.success() {
        return Err(AnalysisError::FfmpegError(format!(
            "FFmpeg exited with code: {:?}",
            status.code()
        )));
    }

    let samples = bytes_to_f64_samples(&buffer);

    // An empty decode is not an error here; the estimators treat it as a
    // degenerate window and report a zero offset.
    if samples.is_empty() {
        tracing::warn!("No audio samples decoded from {}", input_path.display());
    }

    tracing::debug!(
        "Decoded {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        input_path.display()
    );

    Ok(Signal::new(samples, sample_rate))
}

/// Convert raw bytes to f64 samples (little-endian). Trailing bytes are dropped.
fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_to_samples_converts_correctly() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f64.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f64).to_le_bytes());

        let samples = bytes_to_f64_samples(&bytes);

        assert_eq!(samples, vec![0.5, -0.25]);
    }

    #[test]
    fn bytes_to_samples_handles_partial() {
        let bytes = vec![0u8; 10];
        assert_eq!(bytes_to_f64_samples(&bytes).len(), 1);
    }

    #[test]
    fn load_mono_rejects_missing_file() {
        let result = load_mono(Path::new("/nonexistent/file.wav"), DEFAULT_SAMPLE_RATE);
        assert!(matches!(result, Err(AnalysisError::SourceNotFound(_))));
    }
}
