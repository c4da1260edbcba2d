// FFT module - short-time Fourier transform
//
// Frames are centred on multiples of the hop length: the signal is padded
// with n_fft/2 zeros on both sides, so a clip of N samples yields
// 1 + N / hop frames. Each frame is weighted by a periodic Hann window and
// reduced to its power spectrum (|X|^2) over the non-negative frequencies.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::types::FeatureMatrix;

/// STFT processor producing power spectrograms
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    n_fft: usize,
    hop_length: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `n_fft` - FFT window size (2048 by default)
    /// * `hop_length` - Samples between successive frames (512 by default)
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            fft,
            n_fft,
            hop_length,
            window: periodic_hann(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of frequency bins in each frame (n_fft / 2 + 1)
    pub fn n_freqs(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of centred frames for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        let pad = self.n_fft / 2;
        1 + (len + 2 * pad).saturating_sub(self.n_fft) / self.hop_length
    }

    /// Compute the power spectrogram (n_freqs x frames)
    pub fn power_spectrogram(&self, samples: &[f32]) -> FeatureMatrix {
        let n_freqs = self.n_freqs();
        let frames = self.frame_count(samples.len());
        let pad = (self.n_fft / 2) as isize;

        let mut spectrogram = FeatureMatrix::zeros(n_freqs, frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..frames {
            let start = (frame * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 {
                    samples.get(idx as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, value) in buffer[..n_freqs].iter().enumerate() {
                spectrogram.set(bin, frame, value.norm_sqr());
            }
        }

        spectrogram
    }
}

/// Periodic Hann window (DFT-even), matching `scipy.signal.get_window("hann", n)`
pub fn periodic_hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / size as f32).cos())
        .collect()
}
