//! Log-frequency spectrogram of one track.
//!
//! Power is reduced on the fly into one cell per pixel (max over the frames
//! and bins the pixel covers), so even a five minute high resolution view
//! never holds the full STFT matrix.

use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use image::Rgb;

use crate::analysis::{Signal, Stft};

use super::canvas::{blank, blend, frame, save_png, PlotArea};
use super::{DiagnosticError, DiagnosticResult};

const MARGIN: u32 = 20;
const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Matplotlib's magma, sampled at nine evenly spaced stops.
const MAGMA: [[u8; 3]; 9] = [
    [0, 0, 4],
    [28, 16, 68],
    [79, 18, 123],
    [129, 37, 129],
    [181, 54, 122],
    [229, 80, 100],
    [251, 135, 97],
    [254, 194, 135],
    [252, 253, 191],
];

/// Which audio of a job to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrogramTrack {
    Inhouse,
    External,
    Aligned,
}

impl SpectrogramTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inhouse => "inhouse",
            Self::External => "external",
            Self::Aligned => "aligned",
        }
    }
}

impl fmt::Display for SpectrogramTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrogramTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inhouse" => Ok(Self::Inhouse),
            "external" => Ok(Self::External),
            "aligned" => Ok(Self::Aligned),
            other => Err(format!(
                "unknown track '{}' (expected inhouse, external or aligned)",
                other
            )),
        }
    }
}

/// Resolution and extent of a spectrogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectrogramView {
    /// Short overview, rendered for every job.
    #[default]
    Default,
    /// Up to five minutes at the default resolution.
    Long,
    /// Up to five minutes with a finer time and frequency grid.
    HighRes,
}

/// STFT and image geometry for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub n_fft: usize,
    pub hop_length: usize,
    /// Audio beyond this is not drawn.
    pub max_secs: f64,
    pub width: u32,
    pub height: u32,
}

impl SpectrogramView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Long => "long",
            Self::HighRes => "highRes",
        }
    }

    pub fn settings(&self) -> ViewSettings {
        match self {
            Self::Default => ViewSettings {
                n_fft: 2048,
                hop_length: 512,
                max_secs: 30.0,
                width: 960,
                height: 360,
            },
            Self::Long => ViewSettings {
                n_fft: 2048,
                hop_length: 512,
                max_secs: 300.0,
                width: 1200,
                height: 360,
            },
            Self::HighRes => ViewSettings {
                n_fft: 4096,
                hop_length: 256,
                max_secs: 300.0,
                width: 1920,
                height: 640,
            },
        }
    }
}

impl fmt::Display for SpectrogramView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrogramView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "long" => Ok(Self::Long),
            "highRes" => Ok(Self::HighRes),
            other => Err(format!(
                "unknown view '{}' (expected default, long or highRes)",
                other
            )),
        }
    }
}

/// `spectrogram_<track>.png` for the default view,
/// `spectrogram_<track>_<view>.png` otherwise.
pub fn spectrogram_file_name(track: SpectrogramTrack, view: SpectrogramView) -> String {
    match view {
        SpectrogramView::Default => format!("spectrogram_{}.png", track),
        other => format!("spectrogram_{}_{}.png", track, other),
    }
}

/// Render `signal` in `view` and save a PNG.
///
/// Time runs left to right over at most `max_secs`; frequency runs bottom
/// to top on a log axis from one bin up to Nyquist. Levels are dB relative
/// to the loudest cell, floored at -80 dB.
pub fn render_spectrogram(
    signal: &Signal,
    view: SpectrogramView,
    path: &Path,
) -> DiagnosticResult<()> {
    let settings = view.settings();
    let max_len = (settings.max_secs * signal.sample_rate as f64) as usize;
    let samples = &signal.samples[..signal.samples.len().min(max_len)];

    if samples.is_empty() || signal.sample_rate == 0 {
        return Err(DiagnosticError::Empty("signal has no samples".to_string()));
    }

    let stft = Stft::new(settings.n_fft, settings.hop_length);
    let area = PlotArea::with_margin(settings.width, settings.height, MARGIN);
    let cols = area.width as usize;
    let rows = area.height as usize;
    let bands = row_bands(rows, stft.num_bins());
    let num_frames = stft.num_frames(samples.len());

    // cells[col * rows + row], row 0 at the bottom
    let mut cells = vec![0.0f64; cols * rows];
    let mut filled = vec![false; cols];
    let mut peak = 0.0f64;

    stft.for_each_power_frame(samples, |index, power| {
        let col = index * cols / num_frames;
        filled[col] = true;
        let column = &mut cells[col * rows..(col + 1) * rows];
        for (cell, band) in column.iter_mut().zip(&bands) {
            let value = power[band.clone()].iter().copied().fold(0.0, f64::max);
            *cell = cell.max(value);
            peak = peak.max(value);
        }
    });

    // Fewer frames than columns: repeat the last drawn column
    for col in 1..cols {
        if !filled[col] {
            let (done, rest) = cells.split_at_mut(col * rows);
            rest[..rows].copy_from_slice(&done[(col - 1) * rows..]);
        }
    }

    let reference = peak.max(AMIN);
    let mut image = blank(settings.width, settings.height);
    for col in 0..cols {
        for row in 0..rows {
            let db = 10.0 * (cells[col * rows + row].max(AMIN) / reference).log10();
            let level = ((db + TOP_DB) / TOP_DB).clamp(0.0, 1.0);
            let x = area.left + col as u32;
            let y = area.top + (rows - 1 - row) as u32;
            blend(&mut image, x, y, magma(level), 1.0);
        }
    }

    frame(&mut image, &area);
    save_png(&image, path)?;
    tracing::info!(
        "Saved {} spectrogram ({:.1} s): {}",
        view,
        samples.len() as f64 / signal.sample_rate as f64,
        path.display()
    );
    Ok(())
}

/// Bin range drawn in each pixel row, bottom row first.
///
/// Rows are log spaced from bin 1 to the last bin. Every row gets at least
/// one bin, so the low rows repeat bins where the grid is finer than the FFT.
fn row_bands(rows: usize, num_bins: usize) -> Vec<Range<usize>> {
    let last = num_bins.saturating_sub(1).max(1) as f64;
    (0..rows)
        .map(|row| {
            let lo = last.powf(row as f64 / rows as f64);
            let hi = last.powf((row + 1) as f64 / rows as f64);
            let start = (lo.round() as usize).clamp(1, num_bins.saturating_sub(1).max(1));
            let end = if row + 1 == rows {
                num_bins
            } else {
                hi.round() as usize
            };
            let end = end.max(start + 1).min(num_bins.max(start + 1));
            start..end
        })
        .collect()
}

/// Magma color for `level` in `[0, 1]`.
fn magma(level: f64) -> Rgb<u8> {
    let scaled = level.clamp(0.0, 1.0) * (MAGMA.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(MAGMA.len() - 2);
    let frac = scaled - index as f64;
    let (a, b) = (MAGMA[index], MAGMA[index + 1]);
    Rgb([0, 1, 2].map(|c| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * frac).round() as u8))
}
