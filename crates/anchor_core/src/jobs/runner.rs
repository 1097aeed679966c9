//! One complete alignment run.
//!
//! Decode both inputs, draw the optional diagnostics, locate the anchor,
//! write the shift command, optionally apply it and draw a spectrogram per
//! track. Everything lands in a single results folder.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{find_first_anchor, load_mono, Signal};
use crate::diagnostics::{
    render_similarity_curve, render_spectrogram, render_waveform_overlay, spectrogram_file_name,
    SpectrogramTrack, SpectrogramView,
};
use crate::logging::{JobLogger, Stage};
use crate::models::{AlignmentOutcome, AlignmentParameters};
use crate::shift::{
    apply_shift, build_shift_plan, write_command_file, FfmpegCommand, ShiftError, ShiftRequest,
};

use super::JobResult;

/// Shifted audio written when `apply` is set.
pub const ALIGNED_AUDIO_NAME: &str = "aligned.wav";
/// Command text.
pub const COMMAND_FILE_NAME: &str = "aligned_cmd.txt";
/// Raw timeline overlay.
pub const WAVEFORM_PNG_NAME: &str = "waveform_overlay.png";
/// Correlation / similarity curve.
pub const SIMILARITY_PNG_NAME: &str = "similarity_curve.png";

/// Run the whole alignment for two files.
///
/// A failed apply is not an error: its exit code is recorded in the outcome
/// and the command file and plots stay in `results_dir`.
pub fn run_alignment(
    inhouse: &Path,
    external: &Path,
    params: &AlignmentParameters,
    results_dir: &Path,
    logger: &JobLogger,
) -> JobResult<AlignmentOutcome> {
    params.validate()?;

    logger.stage(Stage::Decode);
    let reference = load_mono(inhouse, params.sr)?;
    let target = load_mono(external, params.sr)?;
    logger.info(&format!(
        "In-house: {:.2}s, external: {:.2}s at {} Hz",
        reference.duration_secs(),
        target.duration_secs(),
        params.sr
    ));

    align_signals(
        &reference,
        &target,
        inhouse,
        external,
        params,
        results_dir,
        logger,
    )
}

/// Everything after decoding, on signals already in memory.
pub(crate) fn align_signals(
    reference: &Signal,
    target: &Signal,
    inhouse: &Path,
    external: &Path,
    params: &AlignmentParameters,
    results_dir: &Path,
    logger: &JobLogger,
) -> JobResult<AlignmentOutcome> {
    let anchor_params = params.anchor_params()?;
    let direction = params.direction()?;
    fs::create_dir_all(results_dir)?;

    let waveform_png_path = if params.generate_waveform_png {
        let path = results_dir.join(WAVEFORM_PNG_NAME);
        match render_waveform_overlay(reference, target, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                logger.warn(&format!("Waveform overlay failed: {}", e));
                None
            }
        }
    } else {
        None
    };

    logger.stage(Stage::Anchor);
    let report = find_first_anchor(reference, target, &anchor_params);
    logger.info(&format!(
        "{} anchor => offset (delay external to match in-house) = {}",
        report.source, report.offset
    ));
    logger.debug(&format!(
        "Window: {} in-house / {} external samples, score {:.4}",
        report.reference_samples, report.target_samples, report.score
    ));

    let similarity_png_path = if params.generate_similarity_png {
        let path = results_dir.join(SIMILARITY_PNG_NAME);
        match render_similarity_curve(&report.curve, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                logger.warn(&format!("Similarity plot failed: {}", e));
                None
            }
        }
    } else {
        None
    };

    logger.stage(Stage::Command);
    let plan = build_shift_plan(&ShiftRequest {
        inhouse_path: inhouse.to_path_buf(),
        external_path: external.to_path_buf(),
        sample_rate: params.sr,
        direction,
        offset: report.offset,
        prefer_trim: params.prefer_trim,
        output_path: params.apply.then(|| results_dir.join(ALIGNED_AUDIO_NAME)),
    });

    let command_text = plan.command.to_string();
    logger.command(&command_text);
    write_command_file(&results_dir.join(COMMAND_FILE_NAME), &plan.command)?;

    let (aligned_audio_path, apply_exit_code) = if params.apply {
        apply_logged(&plan.command, &plan.output_path, logger)?
    } else {
        (None, None)
    };

    let spectrogram_paths = if params.generate_spectrograms {
        render_track_spectrograms(
            reference,
            target,
            aligned_audio_path.as_deref(),
            params.sr,
            results_dir,
            logger,
        )
    } else {
        Vec::new()
    };

    logger.flush();

    Ok(AlignmentOutcome {
        offset_sec: report.offset.seconds(),
        anchor_source: report.source,
        instruction: plan.instruction,
        ffmpeg_command: command_text,
        inhouse_path: inhouse.to_path_buf(),
        external_path: external.to_path_buf(),
        aligned_audio_path,
        waveform_png_path,
        similarity_png_path,
        spectrogram_paths,
        apply_exit_code,
        logs: logger.lines(),
    })
}

/// Apply the command, turning a non-zero exit into a logged exit code.
fn apply_logged(
    command: &FfmpegCommand,
    output_path: &Path,
    logger: &JobLogger,
) -> JobResult<(Option<PathBuf>, Option<i32>)> {
    logger.stage(Stage::Apply);
    match apply_shift(command) {
        Ok(()) => {
            logger.success(&format!("Aligned audio: {}", output_path.display()));
            Ok((Some(output_path.to_path_buf()), Some(0)))
        }
        Err(ShiftError::CommandFailed { exit_code, stderr }) => {
            for line in stderr.lines() {
                logger.ffmpeg_line(line);
            }
            logger.dump_ffmpeg_tail();
            logger.error(&format!("FFmpeg returned non-zero exit code: {}", exit_code));
            Ok((None, Some(exit_code)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Default-view spectrogram of each track that is available.
///
/// The aligned track is decoded from the applied output, so it only exists
/// after a successful apply. Failures are logged and skipped.
fn render_track_spectrograms(
    reference: &Signal,
    target: &Signal,
    aligned_audio: Option<&Path>,
    sample_rate: u32,
    results_dir: &Path,
    logger: &JobLogger,
) -> Vec<PathBuf> {
    logger.stage(Stage::Spectrograms);

    let aligned = match aligned_audio.map(|path| load_mono(path, sample_rate)) {
        Some(Ok(signal)) => Some(signal),
        Some(Err(e)) => {
            logger.warn(&format!("Could not decode aligned audio: {}", e));
            None
        }
        None => None,
    };

    let tracks = [
        (SpectrogramTrack::Inhouse, Some(reference)),
        (SpectrogramTrack::External, Some(target)),
        (SpectrogramTrack::Aligned, aligned.as_ref()),
    ];

    let mut paths = Vec::new();
    for (track, signal) in tracks {
        let Some(signal) = signal else {
            continue;
        };
        let path = results_dir.join(spectrogram_file_name(track, SpectrogramView::Default));
        match render_spectrogram(signal, SpectrogramView::Default, &path) {
            Ok(()) => paths.push(path),
            Err(e) => logger.warn(&format!("Spectrogram ({}) failed: {}", track, e)),
        }
    }
    paths
}
