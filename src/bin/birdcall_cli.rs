use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use birdcall_classifier::analysis::features::{FeatureMatrix, FeatureTensor};
use birdcall_classifier::analysis::log_analysis_error;
use birdcall_classifier::config::MelBins;
use birdcall_classifier::error::{AnalysisError, ErrorCode};
use birdcall_classifier::fixtures::{write_wav, SyntheticPattern, SyntheticSpec};
use birdcall_classifier::render::write_pgm;
use birdcall_classifier::{
    analyze_upload, decode_bytes, AnalysisOptions, ExtractorConfig, FeatureExtractor, ModelStore,
    SPECIES,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

/// Exit code when the clip itself cannot be analysed (bad audio, bad model output)
const EXIT_ANALYSIS_FAILED: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "birdcall_cli",
    about = "Bird-call feature extraction and species classification"
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ExtractorArgs {
    /// JSON extractor configuration (defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Mel-bin count for the mel-spectrogram path (64 or 128)
    #[arg(long)]
    mel_bins: Option<u16>,
    /// Divide tensor values by 255 before inference
    #[arg(long)]
    normalize: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract both feature tensors from an audio file and print a JSON summary
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        extractor: ExtractorArgs,
        /// Include the pre-resize MFCC and log-mel matrices in the output
        #[arg(long)]
        include_matrices: bool,
        /// Write mfcc.pgm and melspec.pgm plots into this directory
        #[arg(long)]
        plot_dir: Option<PathBuf>,
    },
    /// Classify an audio file with the MFCC and mel-spectrogram models
    Classify {
        #[arg(long)]
        input: PathBuf,
        /// Directory holding cnn_mfcc.json and cnn_melspec.json
        #[arg(long)]
        models: PathBuf,
        #[command(flatten)]
        extractor: ExtractorArgs,
        #[arg(long)]
        include_matrices: bool,
    },
    /// Write a deterministic synthetic clip as 16-bit WAV
    Synth {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = PatternArg::Sine)]
        pattern: PatternArg,
        #[arg(long, default_value_t = 2_000.0)]
        frequency: f32,
        #[arg(long, default_value_t = 3_000)]
        duration_ms: u32,
        #[arg(long, default_value_t = 22_050)]
        sample_rate: u32,
    },
    /// List the species the classifiers predict
    Species,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    Sine,
    WhiteNoise,
    Silence,
}

impl From<PatternArg> for SyntheticPattern {
    fn from(pattern: PatternArg) -> Self {
        match pattern {
            PatternArg::Sine => SyntheticPattern::Sine,
            PatternArg::WhiteNoise => SyntheticPattern::WhiteNoise,
            PatternArg::Silence => SyntheticPattern::Silence,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Extract {
            input,
            extractor,
            include_matrices,
            plot_dir,
        } => run_extract(&input, &extractor, include_matrices, plot_dir.as_deref()),
        Commands::Classify {
            input,
            models,
            extractor,
            include_matrices,
        } => run_classify(&input, &models, &extractor, include_matrices),
        Commands::Synth {
            output,
            pattern,
            frequency,
            duration_ms,
            sample_rate,
        } => {
            let spec = SyntheticSpec {
                pattern: pattern.into(),
                frequency_hz: frequency,
                duration_ms,
                sample_rate,
                ..SyntheticSpec::default()
            };
            run_synth(&output, &spec)
        }
        Commands::Species => run_species(),
    }
}

fn build_extractor(args: &ExtractorArgs) -> Result<FeatureExtractor> {
    let mut config = match &args.config {
        Some(path) => ExtractorConfig::load_from_file(path),
        None => ExtractorConfig::default(),
    };
    if let Some(bins) = args.mel_bins {
        config.melspec.mel_bins = MelBins::try_from(bins).map_err(anyhow::Error::msg)?;
    }
    if args.normalize {
        config.tensor.normalize = true;
    }
    FeatureExtractor::new(config).context("building feature extractor")
}

fn read_upload(input: &Path) -> Result<(Vec<u8>, Option<String>)> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let hint = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    Ok((bytes, hint))
}

fn run_extract(
    input: &Path,
    args: &ExtractorArgs,
    include_matrices: bool,
    plot_dir: Option<&Path>,
) -> Result<ExitCode> {
    let extractor = build_extractor(args)?;
    let (bytes, hint) = read_upload(input)?;

    let result = decode_bytes(&bytes, hint.as_deref())
        .and_then(|waveform| extractor.extract(&waveform).map(|features| (waveform, features)))
        .map_err(AnalysisError::from);

    let (waveform, features) = match result {
        Ok(value) => value,
        Err(err) => return report_analysis_error(&err, "extract"),
    };

    if let Some(dir) = plot_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        write_pgm(&dir.join("mfcc.pgm"), &features.mfcc_matrix)
            .with_context(|| format!("writing plots to {}", dir.display()))?;
        write_pgm(&dir.join("melspec.pgm"), &features.melspec_db)
            .with_context(|| format!("writing plots to {}", dir.display()))?;
    }

    let payload = ExtractPayload {
        input: input.display().to_string(),
        sample_rate: waveform.sample_rate(),
        samples: waveform.len(),
        duration_secs: waveform.duration_secs(),
        mfcc: TensorSummary::new(&features.mfcc),
        melspec: TensorSummary::new(&features.melspec),
        mfcc_matrix: include_matrices.then_some(&features.mfcc_matrix),
        melspec_db: include_matrices.then_some(&features.melspec_db),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_classify(
    input: &Path,
    models_dir: &Path,
    args: &ExtractorArgs,
    include_matrices: bool,
) -> Result<ExitCode> {
    let extractor = build_extractor(args)?;
    let models = ModelStore::load_dir(models_dir)
        .with_context(|| format!("loading models from {}", models_dir.display()))?;
    let (bytes, hint) = read_upload(input)?;

    let options = AnalysisOptions { include_matrices };
    // analyze_upload logs the error itself
    match analyze_upload(&bytes, hint.as_deref(), &extractor, &models, options) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::from(0))
        }
        Err(err) => {
            print_analysis_error(&err)?;
            Ok(ExitCode::from(EXIT_ANALYSIS_FAILED))
        }
    }
}

fn run_synth(output: &Path, spec: &SyntheticSpec) -> Result<ExitCode> {
    let samples = spec.render();
    write_wav(output, &samples, spec.sample_rate)
        .with_context(|| format!("writing {}", output.display()))?;
    eprintln!(
        "Wrote {} samples ({:?}) to {}",
        samples.len(),
        spec.pattern,
        output.display()
    );
    Ok(ExitCode::from(0))
}

fn run_species() -> Result<ExitCode> {
    for species in SPECIES.iter() {
        println!(
            "{}\t{}\t{}\t{}",
            species.index,
            species.scientific_name,
            species.common_name,
            species.image.unwrap_or("-")
        );
    }
    Ok(ExitCode::from(0))
}

fn report_analysis_error(err: &AnalysisError, context: &str) -> Result<ExitCode> {
    log_analysis_error(err, context);
    print_analysis_error(err)?;
    Ok(ExitCode::from(EXIT_ANALYSIS_FAILED))
}

fn print_analysis_error(err: &AnalysisError) -> Result<()> {
    let payload = ErrorPayload {
        code: err.code(),
        message: err.message(),
    };
    eprintln!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[derive(Serialize)]
struct ErrorPayload {
    code: i32,
    message: String,
}

#[derive(Serialize)]
struct TensorSummary {
    shape: [usize; 3],
    min: f32,
    max: f32,
    mean: f32,
    channels_equal: bool,
}

impl TensorSummary {
    fn new(tensor: &FeatureTensor) -> Self {
        let data = tensor.data();
        let channel0 = tensor.channel(0);
        let channels_equal = (1..tensor.shape()[2]).all(|c| tensor.channel(c) == channel0);
        Self {
            shape: tensor.shape(),
            min: data.iter().copied().fold(f32::INFINITY, f32::min),
            max: data.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            mean: tensor.mean(),
            channels_equal,
        }
    }
}

#[derive(Serialize)]
struct ExtractPayload<'a> {
    input: String,
    sample_rate: u32,
    samples: usize,
    duration_secs: f32,
    mfcc: TensorSummary,
    melspec: TensorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    mfcc_matrix: Option<&'a FeatureMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    melspec_db: Option<&'a FeatureMatrix>,
}
