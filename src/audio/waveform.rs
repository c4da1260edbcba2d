// Waveform - validated mono sample buffer
//
// A Waveform is decoded once per upload and dropped after feature
// extraction. Construction enforces the invariants the extractor relies on:
// at least one sample, a positive sample rate and finite sample values whose
// magnitude stays below MAX_SAMPLE_MAGNITUDE.

use crate::error::ExtractionError;

/// Largest accepted absolute sample value
///
/// Decoded audio lies in [-1, 1]. Far larger values would overflow the f32
/// power spectrum (|X|^2 over a 2048-sample frame) to infinity.
pub const MAX_SAMPLE_MAGNITUDE: f32 = 1.0e6;

/// Mono floating-point samples plus their native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Create a waveform, rejecting empty buffers and invalid sample rates
    ///
    /// # Errors
    /// * `EmptyAudio { samples: 0 }` - no samples
    /// * `Decode` - zero sample rate, a NaN/infinite sample or one above
    ///   `MAX_SAMPLE_MAGNITUDE`
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, ExtractionError> {
        if sample_rate == 0 {
            return Err(ExtractionError::Decode {
                reason: "sample rate must be > 0".to_string(),
            });
        }
        if samples.is_empty() {
            return Err(ExtractionError::EmptyAudio { samples: 0 });
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(ExtractionError::Decode {
                reason: format!("non-finite sample at index {}", index),
            });
        }
        if let Some(index) = samples.iter().position(|s| s.abs() > MAX_SAMPLE_MAGNITUDE) {
            return Err(ExtractionError::Decode {
                reason: format!(
                    "sample {} at index {} exceeds magnitude {}",
                    samples[index], index, MAX_SAMPLE_MAGNITUDE
                ),
            });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed waveform; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// True when every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}
