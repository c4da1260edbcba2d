// Bird-call Classifier Core - audio feature extraction for species classification
// Decodes uploaded clips, builds MFCC and mel-spectrogram image tensors and
// runs them through a pair of frozen classifiers.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod render;

// Re-exports for convenience
pub use analysis::classifier::{Classifier, PredictionResult, TemplateClassifier};
pub use analysis::features::{FeatureExtractor, FeatureFamily, FeatureMatrix, FeatureTensor};
pub use analysis::model_store::{ModelPair, ModelStore};
pub use analysis::species::{species_for_class, Species, SPECIES};
pub use analysis::{analyze_upload, analyze_waveform, AnalysisOptions, AnalysisReport};
pub use audio::{decode_bytes, decode_file, Waveform};
pub use config::ExtractorConfig;
pub use error::{AnalysisError, ErrorCode, ExtractionError, InferenceError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_is_constructible() {
        let extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
        let waveform = Waveform::new(fixtures::sine_wave(16_000, 440.0, 0.5, 8_000), 16_000).unwrap();
        let tensor = extractor.extract_mfcc_tensor(&waveform).unwrap();
        assert_eq!(tensor.shape(), analysis::features::TENSOR_SHAPE);
        assert_eq!(SPECIES.len(), 6);
    }
}
