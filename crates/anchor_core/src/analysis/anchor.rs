//! First-anchor detection over a bounded window.
//!
//! Picks the method chain for the requested mode, runs it over the analysis
//! window and reports the offset together with which method produced it.
//! Content mode always falls back to cross-correlation over the same window.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::methods::{AnchorEstimate, AnchorMethod, ContentSearch, Xcorr};
use super::types::{Offset, SimilarityCurve, Signal};
use super::window::{build_analysis_window, AnalysisWindow, WindowConfig};

/// How the first common anchor is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    /// Normalized cross-correlation.
    #[default]
    Xcorr,
    /// MFCC template search, falling back to cross-correlation.
    Content,
}

impl std::fmt::Display for AnchorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorMode::Xcorr => write!(f, "xcorr"),
            AnchorMode::Content => write!(f, "content"),
        }
    }
}

impl FromStr for AnchorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xcorr" => Ok(AnchorMode::Xcorr),
            "content" => Ok(AnchorMode::Content),
            other => Err(format!("anchor mode must be xcorr or content, got '{}'", other)),
        }
    }
}

/// Which method produced the final offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorSource {
    /// Cross-correlation was requested and used.
    Xcorr,
    /// The content search found the anchor.
    Content,
    /// The content search found nothing; cross-correlation was used instead.
    XcorrFallback,
}

impl std::fmt::Display for AnchorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorSource::Xcorr => write!(f, "XCORR"),
            AnchorSource::Content => write!(f, "CONTENT"),
            AnchorSource::XcorrFallback => write!(f, "Fallback XCORR"),
        }
    }
}

/// Parameters for one anchor search.
#[derive(Debug, Clone)]
pub struct AnchorParams {
    /// Window bounds (start offsets, gate, caps).
    pub window: WindowConfig,
    /// Search mode.
    pub mode: AnchorMode,
    /// Content template length (seconds).
    pub template_secs: f64,
    /// Content hop (seconds).
    pub hop_secs: f64,
    /// Content similarity threshold.
    pub min_similarity: f64,
}

impl Default for AnchorParams {
    fn default() -> Self {
        let content = ContentSearch::default();
        Self {
            window: WindowConfig::default(),
            mode: AnchorMode::default(),
            template_secs: content.template_secs,
            hop_secs: content.hop_secs,
            min_similarity: content.min_similarity,
        }
    }
}

/// Outcome of an anchor search.
#[derive(Debug, Clone)]
pub struct AnchorReport {
    /// Final offset under the target-relative-to-reference convention.
    pub offset: Offset,
    /// Method that produced the offset.
    pub source: AnchorSource,
    /// Best score reported by that method.
    pub score: f64,
    /// Curve for the similarity plot.
    pub curve: SimilarityCurve,
    /// Bounded reference length (samples).
    pub reference_samples: usize,
    /// Bounded target length (samples).
    pub target_samples: usize,
}

/// Bound both recordings and locate the first common anchor.
pub fn find_first_anchor(reference: &Signal, target: &Signal, params: &AnchorParams) -> AnchorReport {
    let window = build_analysis_window(reference, target, &params.window);
    locate_in_window(&window, params)
}

/// Locate the anchor in an already bounded window.
pub fn locate_in_window(window: &AnalysisWindow, params: &AnchorParams) -> AnchorReport {
    let xcorr = Xcorr::new(params.window.max_search_secs);

    let (estimate, source) = match params.mode {
        AnchorMode::Xcorr => (run(&xcorr, window), AnchorSource::Xcorr),
        AnchorMode::Content => {
            let content =
                ContentSearch::new(params.template_secs, params.hop_secs, params.min_similarity);
            match content.locate(window) {
                Some(estimate) => (Some(estimate), AnchorSource::Content),
                None => {
                    tracing::warn!(
                        "Content anchor not found at threshold {:.3}; falling back to xcorr",
                        params.min_similarity
                    );
                    (run(&xcorr, window), AnchorSource::XcorrFallback)
                }
            }
        }
    };

    let (offset, score, curve) = match estimate {
        Some(e) => (e.offset, e.score, e.curve),
        None => (Offset::zero(), 0.0, SimilarityCurve::degenerate()),
    };

    tracing::info!(
        "{} anchor => offset (delay external to match in-house) = {}",
        source,
        offset
    );

    AnchorReport {
        offset,
        source,
        score,
        curve,
        reference_samples: window.reference.len(),
        target_samples: window.target.len(),
    }
}

fn run(method: &dyn AnchorMethod, window: &AnalysisWindow) -> Option<AnchorEstimate> {
    tracing::debug!("Running {} ({})", method.name(), method.description());
    method.locate(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn chirp(len: usize, sample_rate: u32) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * PI * (150.0 * t + 300.0 * t * t)).sin()
            })
            .collect()
    }

    #[test]
    fn anchor_mode_parses() {
        assert_eq!("xcorr".parse::<AnchorMode>().unwrap(), AnchorMode::Xcorr);
        assert_eq!("content".parse::<AnchorMode>().unwrap(), AnchorMode::Content);
        assert!("mfcc".parse::<AnchorMode>().is_err());
    }

    #[test]
    fn xcorr_offset_includes_start_offsets() {
        let sr = 4000;
        let a = chirp(8000, sr);
        let k = 200;
        let mut b = vec![0.0; k];
        b.extend_from_slice(&a);

        // Start both streams 0.5 s in: the lag is unchanged, starts cancel out
        let params = AnchorParams {
            window: WindowConfig {
                ref_start_secs: 0.5,
                target_start_secs: 0.5,
                analysis_secs: 0.0,
                max_search_secs: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let report = find_first_anchor(&Signal::new(a, sr), &Signal::new(b, sr), &params);

        assert_eq!(report.source, AnchorSource::Xcorr);
        assert!((report.offset.seconds() - k as f64 / sr as f64).abs() <= 1.0 / sr as f64);
    }

    #[test]
    fn content_anchor_has_xcorr_sign() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let sr = 8000;
        let reference: Vec<f64> = (0..sr as usize * 2)
            .map(|i| {
                let t = i as f64 / sr as f64;
                let env = 0.6 + 0.4 * (2.0 * PI * 1.5 * t).sin();
                0.3 * env * ((2.0 * PI * 330.0 * t).sin() + 0.5 * (2.0 * PI * 660.0 * t).sin())
            })
            .collect();
        let template_len = sr as usize / 2;

        // Reference head inserted 1.2 s into otherwise unrelated noise
        let k = 9600;
        let mut rng = StdRng::seed_from_u64(5);
        let mut target: Vec<f64> = (0..sr as usize * 3).map(|_| rng.gen_range(-1.0..1.0)).collect();
        target[k..k + template_len].copy_from_slice(&reference[..template_len]);

        let params = AnchorParams {
            mode: AnchorMode::Content,
            template_secs: 0.5,
            hop_secs: 0.05,
            min_similarity: 0.999,
            ..Default::default()
        };

        let report = find_first_anchor(&Signal::new(reference, sr), &Signal::new(target, sr), &params);

        // Target starts later, so it must be delayed: positive, like xcorr
        assert_eq!(report.source, AnchorSource::Content);
        assert!((report.offset.seconds() - 1.2).abs() <= params.hop_secs + 1e-9);
        assert_eq!(report.curve, SimilarityCurve::placeholder());
    }

    #[test]
    fn content_mode_falls_back_to_xcorr() {
        let sr = 4000;
        let a = chirp(2000, sr);
        let k = 100;
        let mut b = vec![0.0; k];
        b.extend_from_slice(&a);

        // Template longer than the reference forces "no anchor found"
        let params = AnchorParams {
            window: WindowConfig {
                max_search_secs: 1.0,
                ..Default::default()
            },
            mode: AnchorMode::Content,
            template_secs: 4.0,
            ..Default::default()
        };

        let report = find_first_anchor(&Signal::new(a, sr), &Signal::new(b, sr), &params);

        assert_eq!(report.source, AnchorSource::XcorrFallback);
        assert!((report.offset.seconds() - k as f64 / sr as f64).abs() <= 1.0 / sr as f64);
        assert!(report.curve.len() > 2);
    }

    #[test]
    fn fallback_applies_start_offsets_like_xcorr() {
        let sr = 4000;
        let a = chirp(4000, sr);

        let params = AnchorParams {
            window: WindowConfig {
                ref_start_secs: 0.25,
                target_start_secs: 0.0,
                analysis_secs: 0.0,
                max_search_secs: 0.5,
                ..Default::default()
            },
            mode: AnchorMode::Content,
            template_secs: 10.0,
            ..Default::default()
        };

        let report = find_first_anchor(&Signal::new(a.clone(), sr), &Signal::new(a, sr), &params);

        // Reference window starts 0.25 s into the same recording: the best lag
        // is -1000 samples (+0.25 s) and the start offsets add another +0.25 s
        assert_eq!(report.source, AnchorSource::XcorrFallback);
        assert!((report.offset.seconds() - 0.5).abs() <= 1.0 / sr as f64);
    }

    #[test]
    fn empty_window_yields_zero_offset() {
        let sr = 1000;
        let params = AnchorParams {
            window: WindowConfig {
                ref_start_secs: 10.0,
                ..Default::default()
            },
            mode: AnchorMode::Content,
            ..Default::default()
        };

        let report = find_first_anchor(
            &Signal::new(vec![0.1; 500], sr),
            &Signal::new(vec![0.1; 500], sr),
            &params,
        );

        assert_eq!(report.offset, Offset::zero());
        assert_eq!(report.reference_samples, 0);
        assert_eq!(report.curve, SimilarityCurve::degenerate());
    }
}
