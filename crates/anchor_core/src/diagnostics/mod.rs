//! Diagnostic PNGs: waveform overlay, similarity curve and per-track
//! spectrograms.
//!
//! Rendering is best effort. Callers log a `DiagnosticError` as a warning and
//! carry on; a failed plot never changes the computed offset.

mod canvas;
mod similarity;
mod spectrogram;
mod waveform;

pub use similarity::{render_similarity_curve, MAX_CURVE_POINTS};
pub use spectrogram::{
    render_spectrogram, spectrogram_file_name, SpectrogramTrack, SpectrogramView, ViewSettings,
};
pub use waveform::render_waveform_overlay;

/// Error types for diagnostic rendering.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticError {
    /// Encoding or writing the PNG failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error creating the output directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing to draw.
    #[error("Nothing to plot: {0}")]
    Empty(String),
}

/// Type alias for diagnostic results.
pub type DiagnosticResult<T> = Result<T, DiagnosticError>;
