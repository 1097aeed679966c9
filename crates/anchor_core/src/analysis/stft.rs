//! Centered short-time Fourier transform.
//!
//! librosa's conventions: frames are centered on `t * hop`, the signal is
//! zero padded by `n_fft / 2` on both sides, and the window is a periodic
//! Hann. A signal of `n` samples yields `1 + n / hop` frames.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// FFT plan and window for one `(n_fft, hop)` pair.
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Stft {
    /// Plan for `n_fft`-point frames every `hop_length` samples. Both are
    /// clamped to at least 1.
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let n_fft = n_fft.max(1);
        let mut planner = FftPlanner::<f64>::new();

        Self {
            n_fft,
            hop_length: hop_length.max(1),
            fft: planner.plan_fft_forward(n_fft),
            window: hann_window(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Non-negative frequency bins per frame.
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for `len` samples.
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Call `visit(frame_index, power)` for every frame in order, `power`
    /// being `|X[k]|²` over the `num_bins()` non-negative bins.
    ///
    /// Only one frame is held at a time, so long signals can be reduced on
    /// the fly.
    pub fn for_each_power_frame<F>(&self, samples: &[f64], mut visit: F)
    where
        F: FnMut(usize, &[f64]),
    {
        let pad = (self.n_fft / 2) as isize;
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        let mut power = vec![0.0; self.num_bins()];

        for frame in 0..self.num_frames(samples.len()) {
            let start = (frame * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, p) in power.iter_mut().enumerate() {
                *p = buffer[bin].norm_sqr();
            }
            visit(frame, &power);
        }
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}
