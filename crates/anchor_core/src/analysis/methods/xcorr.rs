//! Lag-bounded normalized cross-correlation.
//!
//! Uses FFT-based cross-correlation so that multi-minute windows stay cheap:
//! corr(a,b) = IFFT(FFT(a) * conj(FFT(b))).

use rustfft::{num_complex::Complex, FftPlanner};

use crate::analysis::types::{Offset, SimilarityCurve, NORM_EPSILON};
use crate::analysis::window::AnalysisWindow;

use super::{AnchorEstimate, AnchorMethod};

/// Result of a cross-correlation search.
#[derive(Debug, Clone, PartialEq)]
pub struct XcorrEstimate {
    /// Lag (in samples) with the highest normalized score.
    /// Lag `l` pairs `reference[n + l]` with `target[n]`.
    pub best_lag_samples: i64,
    /// Normalized score at the best lag.
    pub peak_score: f64,
    /// Restricted lag/score curve.
    pub curve: SimilarityCurve,
}

impl XcorrEstimate {
    /// Estimate used when either input is empty.
    fn degenerate() -> Self {
        Self {
            best_lag_samples: 0,
            peak_score: 1.0,
            curve: SimilarityCurve::degenerate(),
        }
    }

    /// Offset within the analysis window: `-best_lag / sample_rate`.
    pub fn offset_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        -(self.best_lag_samples as f64) / sample_rate as f64
    }
}

/// Normalized cross-correlation estimator.
#[derive(Debug, Clone, Default)]
pub struct Xcorr {
    /// Search radius in seconds; non-positive means "shorter input - 1".
    pub max_search_secs: f64,
}

impl Xcorr {
    /// Create an estimator with the given search radius.
    pub fn new(max_search_secs: f64) -> Self {
        Self { max_search_secs }
    }

    /// Find the best-aligning lag between `a` (reference) and `b` (target).
    pub fn estimate(&self, a: &[f64], b: &[f64], sample_rate: u32) -> XcorrEstimate {
        if a.is_empty() || b.is_empty() {
            return XcorrEstimate::degenerate();
        }

        let a0 = zero_mean(a);
        let b0 = zero_mean(b);

        let correlation = full_cross_correlation(&a0, &b0);

        let max_lag: i64 = if self.max_search_secs > 0.0 {
            (self.max_search_secs * sample_rate as f64) as i64
        } else {
            a0.len().min(b0.len()) as i64 - 1
        };

        let energy_a: f64 = a0.iter().map(|x| x * x).sum();
        let energy_b: f64 = b0.iter().map(|x| x * x).sum();
        let denom = (energy_a * energy_b).sqrt() + NORM_EPSILON;

        let min_lag = -(b0.len() as i64 - 1);
        let lo = min_lag.max(-max_lag);
        let hi = (a0.len() as i64 - 1).min(max_lag);

        let capacity = if hi >= lo { (hi - lo + 1) as usize } else { 0 };
        let mut lags_secs = Vec::with_capacity(capacity);
        let mut scores = Vec::with_capacity(capacity);
        let mut best: Option<(i64, f64)> = None;

        for lag in lo..=hi {
            // Full correlation index for this lag
            let idx = (lag - min_lag) as usize;
            let score = correlation[idx] / denom;

            // Strict comparison keeps the first (most negative) lag on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((lag, score));
            }

            lags_secs.push(lag as f64 / sample_rate as f64);
            scores.push(score);
        }

        let (best_lag_samples, peak_score) = best.unwrap_or((0, 0.0));

        tracing::debug!(
            "XCORR peak {:.4} at lag {} samples ({} lags searched)",
            peak_score,
            best_lag_samples,
            scores.len()
        );

        XcorrEstimate {
            best_lag_samples,
            peak_score,
            curve: SimilarityCurve { lags_secs, scores },
        }
    }
}

impl AnchorMethod for Xcorr {
    fn name(&self) -> &str {
        "XCORR"
    }

    fn description(&self) -> &str {
        "Normalized cross-correlation using FFT"
    }

    fn locate(&self, window: &AnalysisWindow) -> Option<AnchorEstimate> {
        let estimate = self.estimate(&window.reference, &window.target, window.sample_rate);
        let offset =
            Offset::from_xcorr_lag(estimate.best_lag_samples, window.sample_rate, window.starts);

        Some(AnchorEstimate {
            offset,
            score: estimate.peak_score,
            curve: estimate.curve,
        })
    }
}

/// Subtract the mean to remove DC bias.
fn zero_mean(samples: &[f64]) -> Vec<f64> {
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    samples.iter().map(|x| x - mean).collect()
}

/// Full linear cross-correlation, length `len(a) + len(b) - 1`.
///
/// Index `i` holds lag `i - (len(b) - 1)`, i.e. the output runs from lag
/// `-(len(b) - 1)` up to `len(a) - 1`.
fn full_cross_correlation(a: &[f64], b: &[f64]) -> Vec<f64> {
    let correlation_len = a.len() + b.len() - 1;
    // Three complex buffers of up to twice the correlation length. The target
    // window is capped at reference + 2 * max_search, so max_search bounds
    // the memory of a search.
    let fft_len = correlation_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut a_spec: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    a_spec.resize(fft_len, Complex::new(0.0, 0.0));

    let mut b_spec: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();
    b_spec.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut a_spec);
    fft.process(&mut b_spec);

    let mut product: Vec<Complex<f64>> = a_spec
        .iter()
        .zip(b_spec.iter())
        .map(|(x, y)| x * y.conj())
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;

    // Circular result keeps non-negative lags at the front and negative lags
    // wrapped at the back; unwrap into ascending lag order.
    let neg = b.len() - 1;
    let mut linear = Vec::with_capacity(correlation_len);
    linear.extend(product[fft_len - neg..].iter().map(|c| c.re * scale));
    linear.extend(product[..a.len()].iter().map(|c| c.re * scale));
    linear
}
