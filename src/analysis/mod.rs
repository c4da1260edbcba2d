// Analysis module - upload-to-prediction pipeline
//
// This module orchestrates one request end to end: decode the uploaded
// bytes, extract both feature tensors, run each through its own classifier
// and assemble a report for the presentation layer.
//
// Architecture:
// - Pipeline: decode_bytes -> FeatureExtractor -> (MFCC, mel) classifiers
// - State: none per request. The extractor and the model pair are shared
//   read-only, so concurrent requests need no locking.
// - Errors: logged once here with their code, then returned to the caller

use serde::Serialize;

use crate::audio::{decode_bytes, Waveform};
use crate::error::{log_extraction_error, log_inference_error, AnalysisError};

pub mod classifier;
pub mod features;
pub mod model_store;
pub mod species;

use classifier::{run_inference, Classifier, PredictionResult};
use features::{FeatureExtractor, FeatureFamily, FeatureMatrix, FeatureTensor};
use model_store::ModelPair;
use species::Species;

/// Per-request switches for the report contents
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// Attach the pre-resize MFCC and log-mel matrices for plotting
    pub include_matrices: bool,
}

/// Prediction of one feature family's classifier
#[derive(Debug, Clone, Serialize)]
pub struct FamilyPrediction {
    pub family: FeatureFamily,
    pub model: String,
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub species: &'static Species,
}

impl FamilyPrediction {
    fn new(family: FeatureFamily, classifier: &dyn Classifier, prediction: PredictionResult) -> Self {
        Self {
            family,
            model: classifier.name().to_string(),
            prediction,
            species: prediction.species(),
        }
    }
}

/// Result of analysing one uploaded clip
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub sample_rate: u32,
    pub samples: usize,
    pub duration_secs: f32,
    pub mfcc: FamilyPrediction,
    pub melspec: FamilyPrediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfcc_matrix: Option<FeatureMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melspec_db: Option<FeatureMatrix>,
}

/// Log an analysis error with its code at the request boundary
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    match err {
        AnalysisError::Extraction(err) => log_extraction_error(err, context),
        AnalysisError::Inference(err) => log_inference_error(err, context),
    }
}

/// Decode an uploaded clip and classify it with both models
///
/// # Arguments
/// * `bytes` - Raw container bytes (WAV or MP3)
/// * `extension_hint` - File extension of the upload, if known
/// * `extractor` - Shared feature extractor
/// * `models` - Shared classifier pair
/// * `options` - Report switches
pub fn analyze_upload(
    bytes: &[u8],
    extension_hint: Option<&str>,
    extractor: &FeatureExtractor,
    models: &ModelPair,
    options: AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    let result = decode_bytes(bytes, extension_hint)
        .map_err(AnalysisError::from)
        .and_then(|waveform| classify_waveform(&waveform, extractor, models, options));

    if let Err(err) = &result {
        log_analysis_error(err, "analyze_upload");
    }
    result
}

/// Classify an already decoded waveform with both models
pub fn analyze_waveform(
    waveform: &Waveform,
    extractor: &FeatureExtractor,
    models: &ModelPair,
    options: AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    let result = classify_waveform(waveform, extractor, models, options);
    if let Err(err) = &result {
        log_analysis_error(err, "analyze_waveform");
    }
    result
}

fn classify_waveform(
    waveform: &Waveform,
    extractor: &FeatureExtractor,
    models: &ModelPair,
    options: AnalysisOptions,
) -> Result<AnalysisReport, AnalysisError> {
    let features = extractor.extract(waveform)?;
    let dtype = extractor.config().tensor.dtype;

    let mfcc = predict_family(models.mfcc.as_ref(), &features.mfcc, dtype)?;
    let melspec = predict_family(models.melspec.as_ref(), &features.melspec, dtype)?;

    tracing::info!(
        "[Analysis] {:.2}s @ {} Hz: mfcc -> {} ({:.3}), melspec -> {} ({:.3})",
        waveform.duration_secs(),
        waveform.sample_rate(),
        mfcc.species.scientific_name,
        mfcc.prediction.confidence,
        melspec.species.scientific_name,
        melspec.prediction.confidence
    );

    let (mfcc_matrix, melspec_db) = if options.include_matrices {
        (Some(features.mfcc_matrix), Some(features.melspec_db))
    } else {
        (None, None)
    };

    Ok(AnalysisReport {
        sample_rate: waveform.sample_rate(),
        samples: waveform.len(),
        duration_secs: waveform.duration_secs(),
        mfcc,
        melspec,
        mfcc_matrix,
        melspec_db,
    })
}

fn predict_family(
    classifier: &dyn Classifier,
    tensor: &FeatureTensor,
    dtype: features::InputDtype,
) -> Result<FamilyPrediction, AnalysisError> {
    let prediction = run_inference(classifier, tensor, dtype)?;
    Ok(FamilyPrediction::new(tensor.family(), classifier, prediction))
}

#[cfg(test)]
mod tests;
