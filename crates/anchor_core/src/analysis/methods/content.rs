//! Content (MFCC template) search.
//!
//! Takes a template from the head of the reference, summarizes it as the mean
//! of its MFCCs, then slides a window of the same length across the target and
//! accepts the first window whose mean MFCC vector is close enough (cosine).
//!
//! Cost is `O(num_windows × mfcc_cost)` where
//! `num_windows = (len(target) - template_len) / hop + 1` and `mfcc_cost` grows
//! linearly with the template length. The hop and template lengths are the
//! cost/recall knobs: a shorter hop finds the anchor more precisely but scans
//! proportionally more windows.

use crate::analysis::mfcc::{cosine_similarity, MfccExtractor};
use crate::analysis::types::{Offset, SimilarityCurve};
use crate::analysis::window::AnalysisWindow;

use super::{AnchorEstimate, AnchorMethod};

/// First window in the target that matched the template.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnchor {
    /// Anchor time in seconds from the start of the target window.
    pub anchor_secs: f64,
    /// Anchor position in samples.
    pub start_sample: usize,
    /// Cosine similarity of the accepted window.
    pub similarity: f64,
    /// Number of windows evaluated, including the accepted one.
    pub windows_scanned: usize,
}

/// MFCC template search.
#[derive(Debug, Clone)]
pub struct ContentSearch {
    /// Template length in seconds.
    pub template_secs: f64,
    /// Step between windows in seconds (at least one sample).
    pub hop_secs: f64,
    /// Minimum cosine similarity for a window to count as the anchor.
    pub min_similarity: f64,
}

impl Default for ContentSearch {
    fn default() -> Self {
        Self {
            template_secs: 4.0,
            hop_secs: 0.1,
            min_similarity: 0.78,
        }
    }
}

impl ContentSearch {
    /// Create a search with explicit knobs.
    pub fn new(template_secs: f64, hop_secs: f64, min_similarity: f64) -> Self {
        Self {
            template_secs,
            hop_secs,
            min_similarity,
        }
    }

    /// Find the first window of `b` that matches the head of `a`.
    ///
    /// Returns `None` ("no anchor found") when the template is empty, when
    /// either input is shorter than the template, or when no window reaches
    /// `min_similarity`.
    pub fn find_anchor(&self, a: &[f64], b: &[f64], sample_rate: u32) -> Option<ContentAnchor> {
        let template_len = (self.template_secs * sample_rate as f64).max(0.0) as usize;
        if template_len == 0 || a.len() < template_len {
            tracing::debug!(
                "Content template needs {} samples, reference has {}",
                template_len,
                a.len()
            );
            return None;
        }
        if b.len() < template_len {
            tracing::debug!(
                "Target window ({} samples) shorter than template ({})",
                b.len(),
                template_len
            );
            return None;
        }

        let hop = ((self.hop_secs * sample_rate as f64).max(0.0) as usize).max(1);
        let last_start = b.len() - template_len;

        let extractor = MfccExtractor::new(sample_rate);
        let v1 = extractor.mean_mfcc(&a[..template_len]);

        let mut windows_scanned = 0;
        for start in (0..=last_start).step_by(hop) {
            windows_scanned += 1;
            let v2 = extractor.mean_mfcc(&b[start..start + template_len]);
            let similarity = cosine_similarity(&v1, &v2);

            if similarity >= self.min_similarity {
                tracing::debug!(
                    "Content anchor at sample {} (similarity {:.4}, {} windows)",
                    start,
                    similarity,
                    windows_scanned
                );
                return Some(ContentAnchor {
                    anchor_secs: start as f64 / sample_rate as f64,
                    start_sample: start,
                    similarity,
                    windows_scanned,
                });
            }
        }

        tracing::debug!(
            "No window reached similarity {:.3} ({} windows scanned)",
            self.min_similarity,
            windows_scanned
        );
        None
    }
}

impl AnchorMethod for ContentSearch {
    fn name(&self) -> &str {
        "CONTENT"
    }

    fn description(&self) -> &str {
        "MFCC template search with cosine similarity"
    }

    fn locate(&self, window: &AnalysisWindow) -> Option<AnchorEstimate> {
        let anchor = self.find_anchor(&window.reference, &window.target, window.sample_rate)?;

        Some(AnchorEstimate {
            offset: Offset::from_content_anchor(anchor.anchor_secs, window.starts),
            score: anchor.similarity,
            curve: SimilarityCurve::placeholder(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    const SR: u32 = 8000;

    /// Tonal material with a slow envelope: nothing like white noise.
    fn tonal(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 / SR as f64;
                let env = 0.6 + 0.4 * (2.0 * PI * 1.5 * t).sin();
                0.3 * env
                    * ((2.0 * PI * 330.0 * t).sin()
                        + 0.5 * (2.0 * PI * 660.0 * t).sin()
                        + 0.25 * (2.0 * PI * 1320.0 * t).sin())
            })
            .collect()
    }

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn finds_template_inserted_into_noise() {
        let search = ContentSearch::new(0.5, 0.05, 0.999);
        let reference = tonal(SR as usize * 2);
        let template_len = SR as usize / 2;

        // Template inserted at 1.2 s, a whole number of hops
        let k = 9600;
        let mut target = noise(SR as usize * 3, 7);
        target[k..k + template_len].copy_from_slice(&reference[..template_len]);

        let anchor = search.find_anchor(&reference, &target, SR).unwrap();
        let expected = k as f64 / SR as f64;

        assert!(
            (anchor.anchor_secs - expected).abs() <= search.hop_secs + 1e-9,
            "anchor {} expected {}",
            anchor.anchor_secs,
            expected
        );
        assert!(anchor.similarity >= 0.999);
    }

    #[test]
    fn short_reference_reports_no_anchor() {
        let search = ContentSearch::new(1.0, 0.1, 0.0);
        let reference = tonal(SR as usize / 2);
        let target = tonal(SR as usize * 4);

        assert!(search.find_anchor(&reference, &target, SR).is_none());
    }

    #[test]
    fn empty_inputs_report_no_anchor() {
        let search = ContentSearch::default();
        assert!(search.find_anchor(&[], &[], SR).is_none());
        assert!(search.find_anchor(&tonal(SR as usize * 5), &[], SR).is_none());
    }

    #[test]
    fn unreachable_threshold_reports_no_anchor() {
        let search = ContentSearch::new(0.25, 0.25, 1.5);
        let reference = tonal(SR as usize);

        assert!(search.find_anchor(&reference, &reference, SR).is_none());
    }

    #[test]
    fn first_window_wins_in_hop_order() {
        // Threshold below any cosine similarity: the very first window matches
        let search = ContentSearch::new(0.25, 0.1, -2.0);
        let reference = tonal(SR as usize);
        let target = noise(SR as usize * 2, 3);

        let anchor = search.find_anchor(&reference, &target, SR).unwrap();
        assert_eq!(anchor.start_sample, 0);
        assert_eq!(anchor.windows_scanned, 1);
    }

    #[test]
    fn locate_applies_start_offsets() {
        let search = ContentSearch::new(0.25, 0.05, 0.999);
        let reference = tonal(SR as usize);
        let template_len = SR as usize / 4;
        let k = 4000;
        let mut target = noise(SR as usize * 2, 11);
        target[k..k + template_len].copy_from_slice(&reference[..template_len]);

        let window = AnalysisWindow {
            reference,
            target,
            sample_rate: SR,
            starts: crate::analysis::types::StartOffsets {
                reference_secs: 1.0,
                target_secs: 0.5,
            },
        };

        let estimate = search.locate(&window).unwrap();
        // Anchor at 0.5 s in the window, plus (1.0 - 0.5) of start offsets
        assert!((estimate.offset.seconds() - 1.0).abs() <= search.hop_secs + 1e-9);
        assert_eq!(estimate.curve, SimilarityCurve::placeholder());
    }
}
