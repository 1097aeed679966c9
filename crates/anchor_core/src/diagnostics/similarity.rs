//! Similarity-vs-lag curve.

use std::path::Path;

use crate::analysis::SimilarityCurve;

use super::canvas::{blank, frame, hline, save_png, vline, PlotArea, AXIS, BLUE, GRID, RED};
use super::{DiagnosticError, DiagnosticResult};

/// Curves longer than this are decimated before drawing.
pub const MAX_CURVE_POINTS: usize = 200_000;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 360;
const MARGIN: u32 = 20;

/// Plot normalized similarity against lag and save a PNG.
///
/// The y axis always spans at least `[-1, 1]`; the best point is marked with
/// a red vertical line.
pub fn render_similarity_curve(curve: &SimilarityCurve, path: &Path) -> DiagnosticResult<()> {
    let curve = curve.downsampled(MAX_CURVE_POINTS);
    let points: Vec<(f64, f64)> = curve
        .lags_secs
        .iter()
        .zip(&curve.scores)
        .map(|(&lag, &score)| (lag, score))
        .filter(|(lag, score)| lag.is_finite() && score.is_finite())
        .collect();

    if points.is_empty() {
        return Err(DiagnosticError::Empty(
            "similarity curve has no finite points".to_string(),
        ));
    }

    let (lag_min, lag_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (lag, _)| {
            (lo.min(*lag), hi.max(*lag))
        });
    let (score_min, score_max) = points
        .iter()
        .fold((-1.0f64, 1.0f64), |(lo, hi), (_, s)| (lo.min(*s), hi.max(*s)));

    let mut image = blank(WIDTH, HEIGHT);
    let area = PlotArea::with_margin(WIDTH, HEIGHT, MARGIN);

    for tick in [-0.5, 0.5] {
        hline(&mut image, &area, area.row(tick, score_min, score_max), GRID);
    }
    hline(&mut image, &area, area.row(0.0, score_min, score_max), AXIS);

    // Per column min/max, joined to the previous column so the trace is continuous
    let mut columns: Vec<Option<(f64, f64)>> = vec![None; area.width as usize];
    for &(lag, score) in &points {
        let col = (area.column(lag, lag_min, lag_max) - area.left) as usize;
        let slot = &mut columns[col];
        *slot = Some(match *slot {
            Some((lo, hi)) => (lo.min(score), hi.max(score)),
            None => (score, score),
        });
    }

    let mut previous: Option<u32> = None;
    for (col, range) in columns.iter().enumerate() {
        let Some((lo, hi)) = *range else {
            continue;
        };
        let x = area.left + col as u32;
        let y_hi = area.row(hi, score_min, score_max);
        let y_lo = area.row(lo, score_min, score_max);
        vline(&mut image, x, y_hi, y_lo, BLUE, 1.0);
        if let Some(prev) = previous {
            vline(&mut image, x, prev, y_hi, BLUE, 1.0);
        }
        previous = Some(y_lo);
    }

    if let Some((best_lag, _)) = points
        .iter()
        .copied()
        .reduce(|best, p| if p.1 > best.1 { p } else { best })
    {
        let x = area.column(best_lag, lag_min, lag_max);
        vline(&mut image, x, area.top, area.top + area.height - 1, RED, 0.6);
    }

    frame(&mut image, &area);
    save_png(&image, path)?;
    tracing::info!("Saved similarity curve: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_png_for_xcorr_curve() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plots").join("similarity.png");
        let lags: Vec<f64> = (-500..=500).map(|i| i as f64 / 1000.0).collect();
        let scores: Vec<f64> = lags.iter().map(|l| (-(l * 20.0f64).powi(2)).exp()).collect();
        let curve = SimilarityCurve {
            lags_secs: lags,
            scores,
        };

        render_similarity_curve(&curve, &path).unwrap();

        let image = image::open(&path).unwrap();
        assert_eq!(image.width(), WIDTH);
    }

    #[test]
    fn placeholder_and_degenerate_curves_render() {
        let dir = tempdir().unwrap();
        render_similarity_curve(&SimilarityCurve::placeholder(), &dir.path().join("p.png"))
            .unwrap();
        render_similarity_curve(&SimilarityCurve::degenerate(), &dir.path().join("d.png"))
            .unwrap();
    }

    #[test]
    fn empty_curve_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("e.png");
        let result = render_similarity_curve(&SimilarityCurve::default(), &path);
        assert!(matches!(result, Err(DiagnosticError::Empty(_))));
    }
}
