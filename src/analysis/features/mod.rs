// FeatureExtractor - image-like feature tensors for bird-call classification
//
// This module turns a decoded waveform into two fixed-shape 64x64x3 tensors,
// one per feature family, each consumed by its own external classifier.
//
// Module organization:
// - types: Data structures (FeatureMatrix, FeatureTensor, ClassifierInput)
// - fft: Centred STFT producing power spectrograms
// - mel: Slaney mel filterbank
// - cepstral: Decibel conversion and orthonormal DCT-II
// - resize: Separable image resampling to 64x64
// - mod.rs: Coordinator (FeatureExtractor)
//
// Pipelines (both share one STFT of the clip):
// 1. MFCC: 128-band mel power -> dB (ref 1.0, top_db 80) -> DCT-II
//    -> first 13 coefficients -> resize 13xT to 64x64 -> 3 channels
// 2. Mel-spectrogram: 64 or 128-band mel power -> dB (ref = max, so the
//    peak is 0 dB) -> resize to 64x64 -> 3 channels
//
// Resizing treats the matrix as a grayscale float image: rows (feature
// axis) become image height and columns (time frames) become image width.

mod cepstral;
mod fft;
mod mel;
mod resize;
mod types;

pub use cepstral::{dct_ii_ortho, power_to_db, DbReference, AMIN};
pub use fft::{periodic_hann, StftProcessor};
pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank};
pub use resize::{resize, ResizeFilter};
pub use types::{
    ClassifierInput, FeatureFamily, FeatureMatrix, FeatureTensor, InputData, InputDtype,
    MAX_PIXEL_MAGNITUDE, TENSOR_CHANNELS, TENSOR_HEIGHT, TENSOR_SHAPE, TENSOR_WIDTH,
};

use crate::audio::Waveform;
use crate::config::ExtractorConfig;
use crate::error::ExtractionError;

/// Reference power for the MFCC log-mel stage (absolute dB)
const MFCC_DB_REFERENCE: f32 = 1.0;
/// Dynamic range kept by the MFCC log-mel stage
const MFCC_TOP_DB: f32 = 80.0;

/// Both feature tensors for one clip, plus the matrices they were resized from
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    pub mfcc: FeatureTensor,
    pub melspec: FeatureTensor,
    /// n_mfcc x frames cepstral coefficients before resizing
    pub mfcc_matrix: FeatureMatrix,
    /// mel_bins x frames log-mel spectrogram before resizing
    pub melspec_db: FeatureMatrix,
}

/// FeatureExtractor coordinates the STFT, mel, cepstral and resize stages
///
/// Holds no per-clip state: the same extractor can serve any number of
/// waveforms at any sample rate. Mel filterbanks are built per call because
/// they depend on the clip's native sample rate.
pub struct FeatureExtractor {
    config: ExtractorConfig,
    stft: StftProcessor,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor from a validated configuration
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration fails `ExtractorConfig::validate`.
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractionError> {
        config.validate()?;
        let stft = StftProcessor::new(config.stft.n_fft, config.stft.hop_length);

        tracing::debug!(
            "[FeatureExtractor] n_fft={}, hop={}, n_mfcc={}, mel_bins={}, filter={:?}, normalize={}",
            config.stft.n_fft,
            config.stft.hop_length,
            config.mfcc.n_mfcc,
            config.melspec.mel_bins.count(),
            config.tensor.filter,
            config.tensor.normalize
        );

        Ok(Self { config, stft })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// MFCC matrix (n_mfcc x frames) from a power spectrogram
    pub fn mfcc_matrix(&self, power: &FeatureMatrix, sample_rate: u32) -> FeatureMatrix {
        let bank = MelFilterbank::new(sample_rate, self.config.stft.n_fft, self.config.mfcc.n_mels);
        let mel_power = bank.apply(power);
        let log_mel = power_to_db(
            &mel_power,
            DbReference::Fixed(MFCC_DB_REFERENCE),
            Some(MFCC_TOP_DB),
        );
        dct_ii_ortho(&log_mel, self.config.mfcc.n_mfcc)
    }

    /// Mel power spectrogram (mel_bins x frames) from a power spectrogram
    pub fn mel_power_matrix(&self, power: &FeatureMatrix, sample_rate: u32) -> FeatureMatrix {
        let bank = MelFilterbank::new(
            sample_rate,
            self.config.stft.n_fft,
            self.config.melspec.mel_bins.count(),
        );
        bank.apply(power)
    }

    /// Log-mel spectrogram in dB relative to its own maximum
    pub fn melspec_db_matrix(&self, power: &FeatureMatrix, sample_rate: u32) -> FeatureMatrix {
        let mel_power = self.mel_power_matrix(power, sample_rate);
        power_to_db(&mel_power, DbReference::Max, self.config.melspec.top_db)
    }

    /// Extract the 64x64x3 MFCC tensor
    pub fn extract_mfcc_tensor(&self, waveform: &Waveform) -> Result<FeatureTensor, ExtractionError> {
        let power = self.power_spectrogram(waveform)?;
        let matrix = self.mfcc_matrix(&power, waveform.sample_rate());
        self.to_tensor(FeatureFamily::Mfcc, &matrix)
    }

    /// Extract the 64x64x3 mel-spectrogram tensor
    pub fn extract_melspec_tensor(
        &self,
        waveform: &Waveform,
    ) -> Result<FeatureTensor, ExtractionError> {
        let power = self.power_spectrogram(waveform)?;
        let matrix = self.melspec_db_matrix(&power, waveform.sample_rate());
        self.to_tensor(FeatureFamily::MelSpectrogram, &matrix)
    }

    /// Extract both tensors, sharing one STFT
    pub fn extract(&self, waveform: &Waveform) -> Result<ExtractedFeatures, ExtractionError> {
        let power = self.power_spectrogram(waveform)?;
        let sample_rate = waveform.sample_rate();

        let mfcc_matrix = self.mfcc_matrix(&power, sample_rate);
        let melspec_db = self.melspec_db_matrix(&power, sample_rate);

        let mfcc = self.to_tensor(FeatureFamily::Mfcc, &mfcc_matrix)?;
        let melspec = self.to_tensor(FeatureFamily::MelSpectrogram, &melspec_db)?;

        Ok(ExtractedFeatures {
            mfcc,
            melspec,
            mfcc_matrix,
            melspec_db,
        })
    }

    fn power_spectrogram(&self, waveform: &Waveform) -> Result<FeatureMatrix, ExtractionError> {
        if waveform.is_silent() {
            return Err(ExtractionError::EmptyAudio {
                samples: waveform.len(),
            });
        }

        let power = self.stft.power_spectrogram(waveform.samples());
        tracing::debug!(
            "[FeatureExtractor] {} samples @ {} Hz -> {} STFT frames",
            waveform.len(),
            waveform.sample_rate(),
            power.cols()
        );
        Ok(power)
    }

    fn to_tensor(
        &self,
        family: FeatureFamily,
        matrix: &FeatureMatrix,
    ) -> Result<FeatureTensor, ExtractionError> {
        let image = resize(matrix, TENSOR_HEIGHT, TENSOR_WIDTH, self.config.tensor.filter);
        let mut tensor = FeatureTensor::from_grayscale(family, &image)?;
        if self.config.tensor.normalize {
            tensor = tensor.normalized();
        }
        tensor.ensure_shape(TENSOR_SHAPE)?;
        Ok(tensor)
    }
}
