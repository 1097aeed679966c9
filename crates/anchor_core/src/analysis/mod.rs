//! Audio analysis for first-anchor detection.
//!
//! Finds the time offset between an in-house (reference) recording and an
//! external (target) recording of the same event.
//!
//! # Architecture
//!
//! 1. **Decoding** (`ffmpeg`): decode any input to mono f64 at the analysis rate.
//!
//! 2. **Window** (`window`): slice at start offsets, gate quiet samples, and
//!    cap both sides so correlation cost is bounded.
//!
//! 3. **Methods** (`methods`): normalized cross-correlation, or an MFCC
//!    template search (`mfcc`) that falls back to cross-correlation.
//!
//!    Both the MFCC front end and the diagnostic spectrogram share one
//!    centered STFT (`stft`).
//!
//! 4. **Anchor** (`anchor`): runs the chain for the requested mode and
//!    reports the offset with its source.
//!
//! # Usage
//!
//! ```ignore
//! use anchor_core::analysis::{find_first_anchor, load_mono, AnchorParams};
//!
//! let inhouse = load_mono(inhouse_path, 48000)?;
//! let external = load_mono(external_path, 48000)?;
//! let report = find_first_anchor(&inhouse, &external, &AnchorParams::default());
//! println!("offset = {}", report.offset);
//! ```

pub mod anchor;
mod ffmpeg;
pub mod mfcc;
pub mod methods;
pub mod stft;
pub mod types;
pub mod window;

pub use anchor::{
    find_first_anchor, locate_in_window, AnchorMode, AnchorParams, AnchorReport, AnchorSource,
};
pub use ffmpeg::{load_mono, DEFAULT_SAMPLE_RATE};
pub use stft::Stft;
pub use methods::{AnchorEstimate, AnchorMethod, ContentAnchor, ContentSearch, Xcorr, XcorrEstimate};
pub use types::{
    AnalysisError, AnalysisResult, Offset, Signal, SimilarityCurve, StartOffsets, LEVEL_EPSILON,
    NORM_EPSILON, SIGN_DEAD_ZONE,
};
pub use window::{apply_gate_db, build_analysis_window, AnalysisWindow, WindowConfig};
