//! Waveform overlay of the two raw recordings on a shared time axis.

use std::path::Path;

use crate::analysis::Signal;

use super::canvas::{blank, frame, hline, save_png, vline, PlotArea, AXIS, BLUE, ORANGE};
use super::DiagnosticResult;

const WIDTH: u32 = 1440;
const HEIGHT: u32 = 480;
const MARGIN: u32 = 24;
const ALPHA: f64 = 0.7;

/// Draw both raw timelines (in-house blue, external orange) and save a PNG.
///
/// Each pixel column shows the min/max envelope of the samples it covers.
pub fn render_waveform_overlay(
    reference: &Signal,
    target: &Signal,
    path: &Path,
) -> DiagnosticResult<()> {
    let mut image = blank(WIDTH, HEIGHT);
    let area = PlotArea::with_margin(WIDTH, HEIGHT, MARGIN);

    let duration = reference.duration_secs().max(target.duration_secs());
    let peak = reference
        .samples
        .iter()
        .chain(target.samples.iter())
        .filter(|x| x.is_finite())
        .fold(0.0f64, |acc, x| acc.max(x.abs()));
    let limit = if peak > 0.0 { peak } else { 1.0 };

    hline(&mut image, &area, area.row(0.0, -limit, limit), AXIS);

    for (signal, color) in [(reference, BLUE), (target, ORANGE)] {
        let envelopes = column_envelopes(signal, duration, area.width);
        for (column, (lo, hi)) in envelopes.into_iter().enumerate() {
            let x = area.left + column as u32;
            let y_top = area.row(hi, -limit, limit);
            let y_bottom = area.row(lo, -limit, limit);
            vline(&mut image, x, y_top, y_bottom, color, ALPHA);
        }
    }

    frame(&mut image, &area);
    save_png(&image, path)?;
    tracing::info!("Saved waveform overlay: {}", path.display());
    Ok(())
}

/// Min/max per pixel column, for columns that the signal covers.
///
/// Columns past the end of a shorter signal are omitted.
fn column_envelopes(signal: &Signal, duration_secs: f64, columns: u32) -> Vec<(f64, f64)> {
    if signal.is_empty() || duration_secs <= 0.0 || columns == 0 {
        return Vec::new();
    }

    let samples_per_column = duration_secs * signal.sample_rate as f64 / columns as f64;
    let mut envelopes = Vec::with_capacity(columns as usize);

    for column in 0..columns as usize {
        let start = (column as f64 * samples_per_column) as usize;
        if start >= signal.len() {
            break;
        }
        let end = (((column + 1) as f64 * samples_per_column) as usize)
            .max(start + 1)
            .min(signal.len());

        let (lo, hi) = signal.samples[start..end]
            .iter()
            .filter(|x| x.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        if lo.is_finite() {
            envelopes.push((lo, hi));
        } else {
            envelopes.push((0.0, 0.0));
        }
    }

    envelopes
}
