//! Deterministic audio fixtures for tests and the CLI `synth` command.
//!
//! Synthetic signals are generated in-process (no audio assets checked in)
//! and can be encoded as 16-bit PCM WAV either in memory, to feed the
//! decoder exactly like an upload, or on disk.

use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Seed used for white-noise fixtures so repeated runs are identical.
pub const NOISE_SEED: u64 = 0x5eed_b1d5;

/// Supported deterministic waveform patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticPattern {
    Sine,
    WhiteNoise,
    Silence,
}

/// Declarative description of a synthetic clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub pattern: SyntheticPattern,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u32,
}

impl SyntheticSpec {
    /// Render the spec to mono samples.
    pub fn render(&self) -> Vec<f32> {
        let frames = duration_frames(self.duration_ms, self.sample_rate);
        match self.pattern {
            SyntheticPattern::Sine => {
                sine_wave(self.sample_rate, self.frequency_hz, self.amplitude, frames)
            }
            SyntheticPattern::WhiteNoise => white_noise(NOISE_SEED, self.amplitude, frames),
            SyntheticPattern::Silence => vec![0.0; frames],
        }
    }
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            pattern: SyntheticPattern::Sine,
            frequency_hz: default_frequency_hz(),
            amplitude: default_amplitude(),
            sample_rate: default_sample_rate(),
            duration_ms: default_duration_ms(),
        }
    }
}

fn default_frequency_hz() -> f32 {
    2_000.0
}

fn default_amplitude() -> f32 {
    0.8
}

fn default_sample_rate() -> u32 {
    22_050
}

fn default_duration_ms() -> u32 {
    3_000
}

fn duration_frames(duration_ms: u32, sample_rate: u32) -> usize {
    (duration_ms as u64 * sample_rate as u64 / 1_000) as usize
}

/// Pure sine tone.
pub fn sine_wave(sample_rate: u32, frequency_hz: f32, amplitude: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency_hz * t).sin()
        })
        .collect()
}

/// Uniform white noise from a seeded generator.
pub fn white_noise(seed: u64, amplitude: f32, frames: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames)
        .map(|_| amplitude * rng.gen_range(-1.0f32..1.0))
        .collect()
}

fn wav_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode interleaved samples as a 16-bit PCM WAV file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate, channels))?;
        for &sample in samples {
            writer.write_sample(to_i16(sample))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Write mono samples to a 16-bit PCM WAV file on disk.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let mut writer = hound::WavWriter::create(path, wav_spec(sample_rate, 1))?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()
}

/// Length of one `silent_mp3` frame: MPEG-1 Layer III, 128 kbps, 44.1 kHz, mono.
pub const MP3_FRAME_LEN: usize = 417;

/// Samples decoded from one MPEG-1 Layer III frame.
pub const MP3_FRAME_SAMPLES: usize = 1_152;

const MP3_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

/// Constant-bitrate MP3 stream of `frames` silent frames without a Xing header.
///
/// Every side-info and main-data byte is zero, so each frame decodes to
/// `MP3_FRAME_SAMPLES` zero samples at 44.1 kHz.
pub fn silent_mp3(frames: usize) -> Vec<u8> {
    let mut frame = vec![0u8; MP3_FRAME_LEN];
    frame[..4].copy_from_slice(&MP3_FRAME_HEADER);
    frame.repeat(frames)
}

/// APEv2 tag (one text item plus footer) as appended to the end of MP3 files.
pub fn apev2_tag(key: &str, value: &str) -> Vec<u8> {
    let mut item = Vec::new();
    item.extend((value.len() as u32).to_le_bytes());
    item.extend(0u32.to_le_bytes());
    item.extend(key.as_bytes());
    item.push(0);
    item.extend(value.as_bytes());

    let mut tag = item;
    let tag_size = (tag.len() + 32) as u32;
    tag.extend(b"APETAGEX");
    tag.extend(2_000u32.to_le_bytes());
    tag.extend(tag_size.to_le_bytes());
    tag.extend(1u32.to_le_bytes());
    tag.extend(0u32.to_le_bytes());
    tag.extend([0u8; 8]);
    tag
}

/// 128-byte ID3v1 tag carrying only a title.
pub fn id3v1_tag(title: &str) -> Vec<u8> {
    let mut tag = vec![0u8; 128];
    tag[..3].copy_from_slice(b"TAG");
    let title = &title.as_bytes()[..title.len().min(30)];
    tag[3..3 + title.len()].copy_from_slice(title);
    tag
}
