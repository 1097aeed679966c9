//! Analysis window preparation.
//!
//! Slices both recordings at their start offsets, optionally gates low-level
//! samples, and truncates so the correlation cost stays bounded no matter how
//! long the target recording is.

use super::types::{Signal, StartOffsets, LEVEL_EPSILON};

/// Parameters that bound the analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    /// Where analysis starts in the reference (seconds).
    pub ref_start_secs: f64,
    /// Where analysis starts in the target (seconds).
    pub target_start_secs: f64,
    /// Samples quieter than this (dBFS) are zeroed. `None` disables the gate.
    pub gate_threshold_db: Option<f64>,
    /// Maximum reference length in seconds. Non-positive means no cap.
    pub analysis_secs: f64,
    /// Search radius in seconds. Non-positive falls back to the shorter input.
    pub max_search_secs: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            ref_start_secs: 0.0,
            target_start_secs: 0.0,
            gate_threshold_db: None,
            analysis_secs: 30.0,
            max_search_secs: 60.0,
        }
    }
}

impl WindowConfig {
    /// Start offsets carried into the final `Offset`.
    pub fn starts(&self) -> StartOffsets {
        StartOffsets {
            reference_secs: self.ref_start_secs,
            target_secs: self.target_start_secs,
        }
    }
}

/// Bounded reference/target pair ready for the estimators.
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    /// Bounded reference samples.
    pub reference: Vec<f64>,
    /// Bounded target samples.
    pub target: Vec<f64>,
    /// Shared sample rate.
    pub sample_rate: u32,
    /// Start offsets the window was cut at.
    pub starts: StartOffsets,
}

impl AnalysisWindow {
    /// True when either side is empty; estimators then report a zero offset.
    pub fn is_degenerate(&self) -> bool {
        self.reference.is_empty() || self.target.is_empty()
    }
}

/// Zero every sample whose level is below `threshold_db` dBFS.
///
/// The level is `20·log10(|x| + 1e-12)`. Length is unchanged.
pub fn apply_gate_db(samples: &[f64], threshold_db: Option<f64>) -> Vec<f64> {
    let Some(threshold) = threshold_db else {
        return samples.to_vec();
    };

    samples
        .iter()
        .map(|&x| {
            let level_db = 20.0 * (x.abs() + LEVEL_EPSILON).log10();
            if level_db < threshold {
                0.0
            } else {
                x
            }
        })
        .collect()
}

/// Build the bounded analysis window from two raw recordings.
///
/// Both signals must share a sample rate; the reference's rate is used.
pub fn build_analysis_window(
    reference: &Signal,
    target: &Signal,
    config: &WindowConfig,
) -> AnalysisWindow {
    let sample_rate = reference.sample_rate;
    if reference.sample_rate != target.sample_rate {
        tracing::warn!(
            "Sample rate mismatch ({} vs {}); using reference rate",
            reference.sample_rate,
            target.sample_rate
        );
    }

    let ref_slice = reference.slice_from_secs(config.ref_start_secs);
    let target_slice = target.slice_from_secs(config.target_start_secs);

    let mut ref_samples = apply_gate_db(ref_slice, config.gate_threshold_db);
    let mut target_samples = apply_gate_db(target_slice, config.gate_threshold_db);

    if config.analysis_secs > 0.0 {
        let max_ref = (config.analysis_secs * sample_rate as f64) as usize;
        ref_samples.truncate(max_ref);
    }

    let pad = if config.max_search_secs > 0.0 {
        (config.max_search_secs * sample_rate as f64) as usize
    } else if ref_samples.is_empty() || target_samples.is_empty() {
        0
    } else {
        ref_samples.len().min(target_samples.len()) - 1
    };

    let needed_target = ref_samples.len().saturating_add(pad.saturating_mul(2));
    target_samples.truncate(needed_target);

    tracing::debug!(
        "Analysis sizes (samples): in-house={}, external={}, sr={}",
        ref_samples.len(),
        target_samples.len(),
        sample_rate
    );

    AnalysisWindow {
        reference: ref_samples,
        target: target_samples,
        sample_rate,
        starts: config.starts(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, sample_rate: u32) -> Signal {
        Signal::new((0..len).map(|i| (i as f64 + 1.0) / len as f64).collect(), sample_rate)
    }

    #[test]
    fn gate_zeros_quiet_samples_only() {
        let samples = vec![0.5, 0.001, -0.002, -0.9, 0.0];
        let gated = apply_gate_db(&samples, Some(-40.0));

        assert_eq!(gated.len(), samples.len());
        assert_eq!(gated, vec![0.5, 0.0, 0.0, -0.9, 0.0]);
    }

    #[test]
    fn gate_is_identity_without_threshold() {
        let samples = vec![0.5, 0.0001, -0.3];
        assert_eq!(apply_gate_db(&samples, None), samples);
    }

    #[test]
    fn slices_at_start_offsets() {
        let reference = ramp(1000, 100);
        let target = ramp(1000, 100);
        let config = WindowConfig {
            ref_start_secs: 1.0,
            target_start_secs: 2.0,
            analysis_secs: 0.0,
            max_search_secs: 0.0,
            ..Default::default()
        };

        let window = build_analysis_window(&reference, &target, &config);

        assert_eq!(window.reference.len(), 900);
        assert_eq!(window.reference[0], reference.samples[100]);
        assert_eq!(window.target[0], target.samples[200]);
        assert_eq!(window.starts.reference_secs, 1.0);
        assert_eq!(window.starts.target_secs, 2.0);
    }

    #[test]
    fn start_past_end_yields_degenerate_window() {
        let reference = ramp(100, 100);
        let target = ramp(100, 100);
        let config = WindowConfig {
            ref_start_secs: 5.0,
            ..Default::default()
        };

        let window = build_analysis_window(&reference, &target, &config);

        assert!(window.reference.is_empty());
        assert!(window.is_degenerate());
    }

    #[test]
    fn caps_reference_and_target_with_search_radius() {
        let reference = ramp(10_000, 100);
        let target = ramp(10_000, 100);
        let config = WindowConfig {
            analysis_secs: 10.0,
            max_search_secs: 5.0,
            ..Default::default()
        };

        let window = build_analysis_window(&reference, &target, &config);

        assert_eq!(window.reference.len(), 1000);
        // reference + 2 × 500 samples of search radius
        assert_eq!(window.target.len(), 2000);
    }

    #[test]
    fn zero_radius_pads_by_shorter_input() {
        let reference = ramp(300, 100);
        let target = ramp(5000, 100);
        let config = WindowConfig {
            analysis_secs: 0.0,
            max_search_secs: 0.0,
            ..Default::default()
        };

        let window = build_analysis_window(&reference, &target, &config);

        assert_eq!(window.reference.len(), 300);
        assert_eq!(window.target.len(), 300 + 2 * 299);
    }

    #[test]
    fn short_target_is_left_alone() {
        let reference = ramp(1000, 100);
        let target = ramp(200, 100);
        let window = build_analysis_window(&reference, &target, &WindowConfig::default());

        assert_eq!(window.target.len(), 200);
    }
}
