use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use birdcall_classifier::analysis::model_store::{MELSPEC_MODEL_FILE, MFCC_MODEL_FILE};
use birdcall_classifier::fixtures::{sine_wave, write_wav};
use birdcall_classifier::{ExtractorConfig, FeatureExtractor, TemplateClassifier, Waveform};
use serde_json::Value;

const SAMPLE_RATE: u32 = 22_050;
const CLASS_FREQUENCIES: [f32; 6] = [400.0, 900.0, 1_600.0, 2_500.0, 4_000.0, 6_500.0];

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_birdcall_cli"))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn synth(dir: &Path, name: &str, extra: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let output = cli()
        .args(["synth", "--output", &path_arg(&path)])
        .args(extra)
        .output()
        .expect("failed to run birdcall_cli synth");
    assert!(
        output.status.success(),
        "synth exited with {:?}",
        output.status.code()
    );
    path
}

/// Write template models whose class i matches a tone at CLASS_FREQUENCIES[i]
fn write_tone_models(dir: &Path) {
    let extractor = FeatureExtractor::new(ExtractorConfig::default()).unwrap();
    let features: Vec<_> = CLASS_FREQUENCIES
        .iter()
        .map(|&f| {
            let samples = sine_wave(SAMPLE_RATE, f, 0.8, SAMPLE_RATE as usize * 3);
            extractor
                .extract(&Waveform::new(samples, SAMPLE_RATE).unwrap())
                .unwrap()
        })
        .collect();

    let mfcc: Vec<_> = features.iter().map(|f| f.mfcc.clone()).collect();
    let melspec: Vec<_> = features.iter().map(|f| f.melspec.clone()).collect();
    let models = [
        (MFCC_MODEL_FILE, TemplateClassifier::from_tensors("cnn_mfcc", 100.0, &mfcc).unwrap()),
        (
            MELSPEC_MODEL_FILE,
            TemplateClassifier::from_tensors("cnn_melspec", 100.0, &melspec).unwrap(),
        ),
    ];
    for (file, model) in models {
        fs::write(dir.join(file), serde_json::to_string(&model).unwrap()).unwrap();
    }
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("JSON payload on stdout")
}

#[test]
fn synth_then_extract_reports_fixed_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(dir.path(), "tone.wav", &[]);

    let output = cli()
        .args(["extract", "--input", &path_arg(&clip)])
        .output()
        .expect("failed to run birdcall_cli extract");
    assert!(output.status.success(), "extract exited with {:?}", output.status.code());

    let json = stdout_json(&output);
    assert_eq!(json["sample_rate"], 22_050);
    assert_eq!(json["samples"], 66_150);
    for family in ["mfcc", "melspec"] {
        assert_eq!(json[family]["shape"], serde_json::json!([64, 64, 3]));
        assert_eq!(json[family]["channels_equal"], true);
    }
    assert!(json.get("mfcc_matrix").is_none());
}

#[test]
fn extract_with_matrices_and_plots() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(dir.path(), "tone.wav", &["--duration-ms", "1000"]);
    let plots = dir.path().join("plots");

    let output = cli()
        .args([
            "extract",
            "--input",
            &path_arg(&clip),
            "--mel-bins",
            "128",
            "--include-matrices",
            "--plot-dir",
            &path_arg(&plots),
        ])
        .output()
        .expect("failed to run extract with plots");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["mfcc_matrix"]["rows"], 13);
    assert_eq!(json["melspec_db"]["rows"], 128);

    for plot in ["mfcc.pgm", "melspec.pgm"] {
        let bytes = fs::read(plots.join(plot)).expect("plot written");
        assert!(bytes.starts_with(b"P5\n"));
    }
}

#[test]
fn extract_rejects_unsupported_mel_bins() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(dir.path(), "tone.wav", &["--duration-ms", "500"]);

    let output = cli()
        .args(["extract", "--input", &path_arg(&clip), "--mel-bins", "96"])
        .output()
        .expect("failed to run extract");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn extract_silent_clip_exits_with_analysis_error() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(dir.path(), "silence.wav", &["--pattern", "silence", "--duration-ms", "500"]);

    let output = cli()
        .args(["extract", "--input", &path_arg(&clip)])
        .output()
        .expect("failed to run extract");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("3002"), "expected EmptyAudio code, got {stderr}");
}

#[test]
fn classify_predicts_matching_species() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models");
    fs::create_dir(&models).unwrap();
    write_tone_models(&models);
    let clip = synth(dir.path(), "tone.wav", &["--frequency", "4000"]);

    let output = cli()
        .args(["classify", "--input", &path_arg(&clip), "--models", &path_arg(&models)])
        .output()
        .expect("failed to run classify");
    assert!(output.status.success(), "classify exited with {:?}", output.status.code());

    let json = stdout_json(&output);
    assert_eq!(json["mfcc"]["predicted_class_index"], 4);
    assert_eq!(json["melspec"]["predicted_class_index"], 4);
    assert_eq!(json["melspec"]["species"]["scientific_name"], "Anthipes solitaris");
    assert_eq!(json["melspec"]["species"]["image"], "images/Anthipes_solitaris.jpg");
    let confidence = json["mfcc"]["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
}

#[test]
fn classify_truncated_upload_exits_with_analysis_error() {
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models");
    fs::create_dir(&models).unwrap();
    write_tone_models(&models);

    let clip = synth(dir.path(), "tone.wav", &[]);
    let bytes = fs::read(&clip).unwrap();
    let truncated = dir.path().join("truncated.wav");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let output = cli()
        .args(["classify", "--input", &path_arg(&truncated), "--models", &path_arg(&models)])
        .output()
        .expect("failed to run classify");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("3001"), "expected decode error code, got {stderr}");
}

#[test]
fn classify_without_models_fails() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(dir.path(), "tone.wav", &["--duration-ms", "500"]);

    let output = cli()
        .args([
            "classify",
            "--input",
            &path_arg(&clip),
            "--models",
            &path_arg(&dir.path().join("missing")),
        ])
        .output()
        .expect("failed to run classify");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn species_lists_catalog() {
    let output = cli().arg("species").output().expect("failed to run species");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert_eq!(stdout.lines().count(), 6);
    assert!(stdout.contains("Pitta sordida"));
    assert!(stdout.contains("Buceros rhinoceros"));
    assert!(stdout.contains("images/Pitta_sordida.jpg"));
}

#[test]
fn synth_writes_wav_header() {
    let dir = tempfile::tempdir().unwrap();
    let clip = synth(
        dir.path(),
        "noise.wav",
        &["--pattern", "white-noise", "--sample-rate", "16000", "--duration-ms", "250"],
    );
    let bytes = fs::read(clip).unwrap();
    assert!(bytes.starts_with(b"RIFF"));
    // 44-byte header + 4000 16-bit samples
    assert_eq!(bytes.len(), 44 + 4_000 * 2);
}
