//! MFCC feature extraction for the content search.
//!
//! Follows librosa's `feature.mfcc` defaults so thresholds tuned against it
//! carry over:
//! 1. Centered STFT (zero padding of `n_fft / 2`), periodic Hann window
//! 2. Power spectrum through a Slaney-scale, Slaney-normalized mel filterbank
//! 3. `power_to_db` with `ref = 1.0`, `amin = 1e-10`, `top_db = 80`
//! 4. Orthonormal DCT-II, keeping the first `n_mfcc` coefficients
//!
//! The STFT plan, filterbank and DCT basis are built once per extractor
//! and reused for every window the search slides over.

use std::f64::consts::PI;

use super::stft::Stft;
use super::types::NORM_EPSILON;

/// Number of cepstral coefficients averaged into the timbral vector.
pub const N_MFCC: usize = 20;

const N_FFT: usize = 2048;
const HOP_LENGTH: usize = 512;
const N_MELS: usize = 128;
const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// One triangular mel filter, stored as its non-zero span.
#[derive(Debug, Clone)]
struct MelFilter {
    first_bin: usize,
    weights: Vec<f64>,
}

/// Reusable MFCC extractor for a fixed sample rate.
pub struct MfccExtractor {
    sample_rate: u32,
    stft: Stft,
    filterbank: Vec<MelFilter>,
    /// dct[k][m], orthonormal DCT-II basis.
    dct: Vec<Vec<f64>>,
}

impl std::fmt::Debug for MfccExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfccExtractor")
            .field("sample_rate", &self.sample_rate)
            .field("n_fft", &N_FFT)
            .field("n_mels", &self.filterbank.len())
            .field("n_mfcc", &self.dct.len())
            .finish()
    }
}

impl MfccExtractor {
    /// Build an extractor for `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            stft: Stft::new(N_FFT, HOP_LENGTH),
            filterbank: mel_filterbank(sample_rate, N_FFT, N_MELS),
            dct: dct_basis(N_MFCC, N_MELS),
        }
    }

    /// Sample rate this extractor was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Compute MFCCs, returned as `mfcc[frame][coefficient]`.
    pub fn mfcc(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        let mel_db = self.log_mel_spectrogram(samples);
        mel_db
            .iter()
            .map(|frame| {
                self.dct
                    .iter()
                    .map(|basis| basis.iter().zip(frame).map(|(b, x)| b * x).sum())
                    .collect()
            })
            .collect()
    }

    /// Per-coefficient mean of the MFCCs across all frames.
    pub fn mean_mfcc(&self, samples: &[f64]) -> Vec<f64> {
        let frames = self.mfcc(samples);
        let mut mean = vec![0.0; N_MFCC];
        if frames.is_empty() {
            return mean;
        }

        for frame in &frames {
            for (acc, value) in mean.iter_mut().zip(frame) {
                *acc += value;
            }
        }
        let count = frames.len() as f64;
        mean.iter_mut().for_each(|v| *v /= count);
        mean
    }

    /// Mel power spectrogram in dB, `[frame][mel_band]`.
    fn log_mel_spectrogram(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        let mut mel_db = Vec::with_capacity(self.stft.num_frames(samples.len()));
        let mut peak_db = f64::NEG_INFINITY;

        self.stft.for_each_power_frame(samples, |_, power| {
            let bands: Vec<f64> = self
                .filterbank
                .iter()
                .map(|filter| {
                    let energy: f64 = filter
                        .weights
                        .iter()
                        .zip(&power[filter.first_bin..])
                        .map(|(w, p)| w * p)
                        .sum();
                    let db = 10.0 * energy.max(AMIN).log10();
                    peak_db = peak_db.max(db);
                    db
                })
                .collect();
            mel_db.push(bands);
        });

        let floor = peak_db - TOP_DB;
        for frame in &mut mel_db {
            for value in frame.iter_mut() {
                *value = value.max(floor);
            }
        }

        mel_db
    }
}

/// Cosine similarity with the norm floor: `v1·v2 / (‖v1‖‖v2‖ + 1e-12)`.
pub fn cosine_similarity(v1: &[f64], v2: &[f64]) -> f64 {
    let dot: f64 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    let norm1 = v1.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm2 = v2.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (norm1 * norm2 + NORM_EPSILON)
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters from 0 Hz to Nyquist with Slaney area normalization.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<MelFilter> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|i| i as f64 * nyquist / (n_bins - 1) as f64)
        .collect();

    let mel_max = hz_to_mel(nyquist);
    let mel_hz: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let lower_edge = mel_hz[m];
            let center = mel_hz[m + 1];
            let upper_edge = mel_hz[m + 2];
            let norm = 2.0 / (upper_edge - lower_edge);

            let dense: Vec<f64> = fft_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - lower_edge) / (center - lower_edge);
                    let falling = (upper_edge - f) / (upper_edge - center);
                    rising.min(falling).max(0.0) * norm
                })
                .collect();

            let first = dense.iter().position(|&w| w > 0.0);
            let last = dense.iter().rposition(|&w| w > 0.0);
            match (first, last) {
                (Some(first), Some(last)) => MelFilter {
                    first_bin: first,
                    weights: dense[first..=last].to_vec(),
                },
                // Narrow low bands can fall between FFT bins
                _ => MelFilter {
                    first_bin: 0,
                    weights: Vec::new(),
                },
            }
        })
        .collect()
}

/// Orthonormal DCT-II basis, `n_out × n_in`.
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n_in as f64).sqrt()
            } else {
                (2.0 / n_in as f64).sqrt()
            };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n_in as f64)).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f64, len: usize, sample_rate: u32) -> Vec<f64> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0, 250.0, 999.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn filterbank_has_requested_bands() {
        let filterbank = mel_filterbank(22050, N_FFT, N_MELS);
        assert_eq!(filterbank.len(), N_MELS);
        assert!(filterbank
            .iter()
            .all(|f| f.first_bin + f.weights.len() <= N_FFT / 2 + 1));
    }

    #[test]
    fn dct_basis_is_orthonormal() {
        let basis = dct_basis(N_MFCC, N_MELS);
        for (i, row_i) in basis.iter().enumerate() {
            for (j, row_j) in basis.iter().enumerate() {
                let dot: f64 = row_i.iter().zip(row_j).map(|(a, b)| a * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9, "rows {} and {}", i, j);
            }
        }
    }

    #[test]
    fn frame_count_matches_centered_stft() {
        let extractor = MfccExtractor::new(8000);
        let frames = extractor.mfcc(&tone(440.0, 4000, 8000));

        assert_eq!(frames.len(), 1 + 4000 / HOP_LENGTH);
        assert_eq!(frames[0].len(), N_MFCC);
    }

    #[test]
    fn identical_audio_has_unit_similarity() {
        let extractor = MfccExtractor::new(8000);
        let samples = tone(440.0, 4000, 8000);
        let v1 = extractor.mean_mfcc(&samples);
        let v2 = extractor.mean_mfcc(&samples);

        assert_eq!(v1.len(), N_MFCC);
        assert!(cosine_similarity(&v1, &v2) > 0.999_999);
    }

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
    }
}
