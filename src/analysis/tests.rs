use super::*;
use crate::analysis::classifier::TemplateClassifier;
use crate::analysis::features::TENSOR_SHAPE;
use crate::config::ExtractorConfig;
use crate::error::{ErrorCode, ExtractionError, ExtractionErrorCodes};
use crate::fixtures::{encode_wav, sine_wave};
use std::thread;

const SAMPLE_RATE: u32 = 22_050;
/// One tone per species class
const CLASS_FREQUENCIES: [f32; 6] = [400.0, 900.0, 1_600.0, 2_500.0, 4_000.0, 6_500.0];

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(ExtractorConfig::default()).unwrap()
}

fn tone(frequency: f32) -> Waveform {
    Waveform::new(sine_wave(SAMPLE_RATE, frequency, 0.6, SAMPLE_RATE as usize), SAMPLE_RATE).unwrap()
}

/// Template models whose class i is the tensor of CLASS_FREQUENCIES[i]
fn tone_models(extractor: &FeatureExtractor) -> ModelPair {
    let features: Vec<_> = CLASS_FREQUENCIES
        .iter()
        .map(|&f| extractor.extract(&tone(f)).unwrap())
        .collect();
    let mfcc: Vec<_> = features.iter().map(|f| f.mfcc.clone()).collect();
    let melspec: Vec<_> = features.iter().map(|f| f.melspec.clone()).collect();

    ModelPair::new(
        Box::new(TemplateClassifier::from_tensors("cnn_mfcc", 100.0, &mfcc).unwrap()),
        Box::new(TemplateClassifier::from_tensors("cnn_melspec", 100.0, &melspec).unwrap()),
    )
}

fn wav_bytes(frequency: f32) -> Vec<u8> {
    let samples = sine_wave(SAMPLE_RATE, frequency, 0.6, SAMPLE_RATE as usize);
    encode_wav(&samples, SAMPLE_RATE, 1).unwrap()
}

#[test]
fn test_waveform_classified_by_both_families() {
    let extractor = extractor();
    let models = tone_models(&extractor);

    for (class, &frequency) in CLASS_FREQUENCIES.iter().enumerate() {
        let report =
            analyze_waveform(&tone(frequency), &extractor, &models, AnalysisOptions::default())
                .unwrap();
        assert_eq!(report.mfcc.prediction.predicted_class_index, class);
        assert_eq!(report.melspec.prediction.predicted_class_index, class);
        assert_eq!(report.mfcc.family, FeatureFamily::Mfcc);
        assert_eq!(report.melspec.family, FeatureFamily::MelSpectrogram);
        assert_eq!(report.mfcc.species.index, class);
        assert!(report.mfcc_matrix.is_none());
    }
}

#[test]
fn test_upload_roundtrip_through_wav() {
    let extractor = extractor();
    let models = tone_models(&extractor);

    let report = analyze_upload(
        &wav_bytes(2_500.0),
        Some("wav"),
        &extractor,
        &models,
        AnalysisOptions::default(),
    )
    .unwrap();

    assert_eq!(report.sample_rate, SAMPLE_RATE);
    assert_eq!(report.samples, SAMPLE_RATE as usize);
    assert!((report.duration_secs - 1.0).abs() < 1e-6);
    // 16-bit quantisation moves the tensor slightly off the template
    assert_eq!(report.mfcc.prediction.predicted_class_index, 3);
    assert_eq!(report.melspec.prediction.predicted_class_index, 3);
    assert_eq!(report.melspec.model, "cnn_melspec");
}

#[test]
fn test_include_matrices() {
    let extractor = extractor();
    let models = tone_models(&extractor);
    let options = AnalysisOptions {
        include_matrices: true,
    };

    let report = analyze_waveform(&tone(900.0), &extractor, &models, options).unwrap();
    let mfcc = report.mfcc_matrix.as_ref().unwrap();
    let melspec = report.melspec_db.as_ref().unwrap();
    assert_eq!(mfcc.rows(), 13);
    assert_eq!(melspec.rows(), 64);
    assert_eq!(melspec.max(), 0.0);
}

#[test]
fn test_report_serializes_to_json() {
    let extractor = extractor();
    let models = tone_models(&extractor);
    let report =
        analyze_waveform(&tone(400.0), &extractor, &models, AnalysisOptions::default()).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mfcc"]["predicted_class_index"], 0);
    assert_eq!(json["mfcc"]["family"], "mfcc");
    assert_eq!(json["melspec"]["family"], "mel_spectrogram");
    assert_eq!(json["melspec"]["species"]["scientific_name"], "Pitta sordida");
    assert!(json.get("mfcc_matrix").is_none());
}

#[test]
fn test_truncated_upload_is_decode_error() {
    let extractor = extractor();
    let models = tone_models(&extractor);
    let bytes = wav_bytes(900.0);
    let truncated = &bytes[..bytes.len() / 2];

    let err = analyze_upload(truncated, Some("wav"), &extractor, &models, AnalysisOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ExtractionErrorCodes::DECODE);
}

#[test]
fn test_silent_upload_is_empty_audio() {
    let extractor = extractor();
    let models = tone_models(&extractor);
    let bytes = encode_wav(&vec![0.0; 4_096], SAMPLE_RATE, 1).unwrap();

    let err = analyze_upload(&bytes, Some("wav"), &extractor, &models, AnalysisOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        AnalysisError::Extraction(ExtractionError::EmptyAudio { samples: 4_096 })
    );
}

#[test]
fn test_model_input_shape_mismatch() {
    let extractor = extractor();
    let small = TemplateClassifier::new("small", [32, 32, 3], 1.0, vec![vec![0.0; 32 * 32 * 3]; 6])
        .unwrap();
    let models = ModelPair::new(
        Box::new(small),
        Box::new(
            TemplateClassifier::new("full", TENSOR_SHAPE, 1.0, vec![vec![0.0; 64 * 64 * 3]; 6])
                .unwrap(),
        ),
    );

    let err = analyze_waveform(&tone(900.0), &extractor, &models, AnalysisOptions::default())
        .unwrap_err();
    assert_eq!(err.code(), ExtractionErrorCodes::SHAPE_MISMATCH);
}

#[test]
fn test_concurrent_requests_share_extractor_and_models() {
    let extractor = extractor();
    let models = tone_models(&extractor);
    let uploads: Vec<Vec<u8>> = CLASS_FREQUENCIES.iter().map(|&f| wav_bytes(f)).collect();

    let predictions: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = uploads
            .iter()
            .map(|bytes| {
                let extractor = &extractor;
                let models = &models;
                scope.spawn(move || {
                    analyze_upload(bytes, Some("wav"), extractor, models, AnalysisOptions::default())
                        .unwrap()
                        .melspec
                        .prediction
                        .predicted_class_index
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(predictions, vec![0, 1, 2, 3, 4, 5]);
}
