//! Configuration for the feature extractor
//!
//! This module provides runtime configuration loading from JSON files so the
//! variant-specific choices (mel-bin count, normalisation, interpolation
//! filter, classifier input dtype) can be switched without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::features::{InputDtype, ResizeFilter};
use crate::error::ExtractionError;

/// Complete extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtractorConfig {
    pub stft: StftConfig,
    pub mfcc: MfccConfig,
    pub melspec: MelSpecConfig,
    pub tensor: TensorConfig,
}

/// Short-time Fourier transform parameters shared by both feature families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StftConfig {
    /// FFT window size in samples
    pub n_fft: usize,
    /// Hop size between frame centres
    pub hop_length: usize,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
        }
    }
}

/// MFCC parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccConfig {
    /// Number of cepstral coefficients kept after the DCT
    pub n_mfcc: usize,
    /// Mel bands computed before the DCT
    pub n_mels: usize,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_mels: 128,
        }
    }
}

/// Mel-spectrogram parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelSpecConfig {
    pub mel_bins: MelBins,
    /// Dynamic range floor below the maximum (dB); `None` disables clipping
    pub top_db: Option<f32>,
}

impl Default for MelSpecConfig {
    fn default() -> Self {
        Self {
            mel_bins: MelBins::Bins64,
            top_db: Some(80.0),
        }
    }
}

/// Tensor post-processing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TensorConfig {
    /// Divide tensor values by 255 before inference
    pub normalize: bool,
    /// Interpolation filter used for the 64x64 image resize
    pub filter: ResizeFilter,
    /// Element type of the batch handed to the classifier
    pub dtype: InputDtype,
}

/// Supported mel-bin counts for the mel-spectrogram path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum MelBins {
    #[default]
    Bins64,
    Bins128,
}

impl MelBins {
    pub fn count(self) -> usize {
        match self {
            MelBins::Bins64 => 64,
            MelBins::Bins128 => 128,
        }
    }
}

impl TryFrom<u16> for MelBins {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            64 => Ok(MelBins::Bins64),
            128 => Ok(MelBins::Bins128),
            other => Err(format!("mel_bins must be 64 or 128 (got {})", other)),
        }
    }
}

impl From<MelBins> for u16 {
    fn from(bins: MelBins) -> Self {
        bins.count() as u16
    }
}

impl ExtractorConfig {
    /// Load configuration from JSON file
    ///
    /// Missing sections fall back to their defaults. If the file cannot be
    /// read or parsed the default configuration is returned and a warning is
    /// logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check invariants the extractor relies on
    pub fn validate(&self) -> Result<(), ExtractionError> {
        let invalid = |reason: String| Err(ExtractionError::InvalidConfig { reason });

        if self.stft.n_fft < 2 {
            return invalid(format!("n_fft must be >= 2 (got {})", self.stft.n_fft));
        }
        if self.stft.hop_length == 0 || self.stft.hop_length > self.stft.n_fft {
            return invalid(format!(
                "hop_length must be in 1..={} (got {})",
                self.stft.n_fft, self.stft.hop_length
            ));
        }
        if self.mfcc.n_mels == 0 {
            return invalid("mfcc.n_mels must be > 0".to_string());
        }
        if self.mfcc.n_mfcc == 0 || self.mfcc.n_mfcc > self.mfcc.n_mels {
            return invalid(format!(
                "n_mfcc must be in 1..={} (got {})",
                self.mfcc.n_mels, self.mfcc.n_mfcc
            ));
        }
        if let Some(top_db) = self.melspec.top_db {
            if !(top_db.is_finite() && top_db > 0.0) {
                return invalid(format!("top_db must be positive (got {})", top_db));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExtractorConfig::default();
        assert_eq!(config.stft.n_fft, 2048);
        assert_eq!(config.stft.hop_length, 512);
        assert_eq!(config.mfcc.n_mfcc, 13);
        assert_eq!(config.mfcc.n_mels, 128);
        assert_eq!(config.melspec.mel_bins.count(), 64);
        assert_eq!(config.melspec.top_db, Some(80.0));
        assert!(!config.tensor.normalize);
        assert_eq!(config.tensor.filter, ResizeFilter::Bicubic);
        assert_eq!(config.tensor.dtype, InputDtype::Float32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = ExtractorConfig::default();
        config.melspec.mel_bins = MelBins::Bins128;
        config.tensor.normalize = true;

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"mel_bins\": 128"));
        let parsed: ExtractorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: ExtractorConfig =
            serde_json::from_str(r#"{ "tensor": { "normalize": true, "filter": "bilinear" } }"#)
                .unwrap();
        assert!(parsed.tensor.normalize);
        assert_eq!(parsed.tensor.filter, ResizeFilter::Bilinear);
        assert_eq!(parsed.stft, StftConfig::default());
        assert_eq!(parsed.melspec.mel_bins, MelBins::Bins64);
    }

    #[test]
    fn test_rejects_unsupported_mel_bins() {
        let result: Result<ExtractorConfig, _> =
            serde_json::from_str(r#"{ "melspec": { "mel_bins": 96 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ExtractorConfig::default();
        config.stft.hop_length = 0;
        assert!(matches!(
            config.validate(),
            Err(ExtractionError::InvalidConfig { .. })
        ));

        let mut config = ExtractorConfig::default();
        config.mfcc.n_mfcc = 200;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.melspec.top_db = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = ExtractorConfig::load_from_file("does/not/exist.json");
        assert_eq!(config, ExtractorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extractor.json");
        fs::write(&path, r#"{ "melspec": { "mel_bins": 128, "top_db": null } }"#).unwrap();

        let config = ExtractorConfig::load_from_file(&path);
        assert_eq!(config.melspec.mel_bins, MelBins::Bins128);
        assert_eq!(config.melspec.top_db, None);
    }
}
