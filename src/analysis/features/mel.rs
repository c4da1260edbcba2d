// Mel module - Slaney mel filterbank
//
// Triangular filters spaced evenly on the Slaney mel scale (linear below
// 1 kHz, logarithmic above) with Slaney area normalisation, so each filter
// has unit area in Hz. Weights are computed in f64 and stored as f32.

use super::types::FeatureMatrix;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1_000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Evenly spaced values including both endpoints
fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num == 1 {
        return vec![start];
    }
    let step = (stop - start) / (num - 1) as f64;
    let mut values: Vec<f64> = (0..num).map(|i| i as f64 * step + start).collect();
    values[num - 1] = stop;
    values
}

/// Mel filterbank matrix (n_mels x n_freqs)
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    n_mels: usize,
    n_freqs: usize,
    weights: Vec<f32>,
}

impl MelFilterbank {
    /// Build a filterbank covering 0 Hz to Nyquist
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate of the analysed signal (Hz)
    /// * `n_fft` - FFT size used by the STFT
    /// * `n_mels` - Number of mel bands
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        Self::with_range(sample_rate, n_fft, n_mels, 0.0, sample_rate as f64 / 2.0)
    }

    /// Build a filterbank restricted to `fmin..=fmax` Hz
    pub fn with_range(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_freqs = n_fft / 2 + 1;
        let fft_freqs = linspace(0.0, sample_rate as f64 / 2.0, n_freqs);

        let mel_points = linspace(hz_to_mel(fmin), hz_to_mel(fmax), n_mels + 2);
        let hz_points: Vec<f64> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();

        let mut weights = vec![0.0f32; n_mels * n_freqs];
        for m in 0..n_mels {
            let lower_width = hz_points[m + 1] - hz_points[m];
            let upper_width = hz_points[m + 2] - hz_points[m + 1];
            let enorm = 2.0 / (hz_points[m + 2] - hz_points[m]);

            for (k, &freq) in fft_freqs.iter().enumerate() {
                let lower = (freq - hz_points[m]) / lower_width;
                let upper = (hz_points[m + 2] - freq) / upper_width;
                let weight = lower.min(upper).max(0.0);
                weights[m * n_freqs + k] = (weight * enorm) as f32;
            }
        }

        let empty = (0..n_mels)
            .filter(|&m| weights[m * n_freqs..(m + 1) * n_freqs].iter().all(|&w| w == 0.0))
            .count();
        if empty > 0 {
            log::warn!(
                "[MelFilterbank] {} of {} mel bands are empty (n_fft={}, sample_rate={})",
                empty,
                n_mels,
                n_fft,
                sample_rate
            );
        }

        Self {
            n_mels,
            n_freqs,
            weights,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn n_freqs(&self) -> usize {
        self.n_freqs
    }

    /// Weights of one mel band across all frequency bins
    pub fn band(&self, mel: usize) -> &[f32] {
        &self.weights[mel * self.n_freqs..(mel + 1) * self.n_freqs]
    }

    /// Project a power spectrogram (n_freqs x frames) onto the mel bands
    pub fn apply(&self, power: &FeatureMatrix) -> FeatureMatrix {
        debug_assert_eq!(power.rows(), self.n_freqs);
        let frames = power.cols();
        let mut mel = FeatureMatrix::zeros(self.n_mels, frames);

        for m in 0..self.n_mels {
            let out = mel.row_mut(m);
            for (k, &weight) in self.band(m).iter().enumerate() {
                if weight == 0.0 {
                    continue;
                }
                for (acc, &p) in out.iter_mut().zip(power.row(k)) {
                    *acc += weight * p;
                }
            }
        }

        mel
    }
}
