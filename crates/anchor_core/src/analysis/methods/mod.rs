//! Anchor detection methods.
//!
//! This module defines the `AnchorMethod` trait and its two implementations:
//! normalized cross-correlation and MFCC template search. Each method turns a
//! bounded analysis window into an `Offset` built at exactly one place.

mod content;
mod xcorr;

pub use content::{ContentAnchor, ContentSearch};
pub use xcorr::{Xcorr, XcorrEstimate};

use crate::analysis::types::{Offset, SimilarityCurve};
use crate::analysis::window::AnalysisWindow;

/// Offset found by one method, with its diagnostic curve.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorEstimate {
    /// Recording-time offset (start offsets already applied).
    pub offset: Offset,
    /// Peak correlation score or the cosine similarity of the accepted window.
    pub score: f64,
    /// Similarity curve for plotting.
    pub curve: SimilarityCurve,
}

/// Trait for anchor detection methods.
pub trait AnchorMethod: Send + Sync {
    /// Name of this method.
    fn name(&self) -> &str;

    /// Short description of the method.
    fn description(&self) -> &str;

    /// Look for the first common anchor in the window.
    ///
    /// `None` means "no anchor found" and is not an error; the caller moves
    /// on to its fallback method.
    fn locate(&self, window: &AnalysisWindow) -> Option<AnchorEstimate>;
}
