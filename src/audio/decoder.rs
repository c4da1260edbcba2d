// Decoder - uploaded bytes to mono Waveform
//
// Uploaded clips (MP3 or WAV) are probed and decoded with symphonia at their
// native sample rate. Multi-channel audio is down-mixed by averaging the
// channels of each frame. Truncated uploads are reported instead of
// returning the partial signal: PCM streams must reach the frame count
// declared by their data chunk, and MPEG streams must not end inside a
// frame (see `mpeg::find_truncated_frame`).

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CodecType, DecoderOptions, CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use super::mpeg::find_truncated_frame;
use super::waveform::Waveform;
use crate::error::ExtractionError;

fn is_mpeg_audio(codec: CodecType) -> bool {
    [CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3].contains(&codec)
}

/// Decode an in-memory audio file
///
/// # Arguments
/// * `bytes` - Complete encoded file (MP3 or WAV container)
/// * `extension_hint` - Optional file extension ("mp3", "wav") to speed up probing
///
/// # Errors
/// * `Decode` - unsupported/malformed container, codec failure or truncated stream
/// * `EmptyAudio` - the stream decoded to zero frames
pub fn decode_bytes(bytes: &[u8], extension_hint: Option<&str>) -> Result<Waveform, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Decode {
            reason: "upload is empty".to_string(),
        });
    }

    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| ExtractionError::Decode {
            reason: format!("failed to probe audio container: {}", err),
        })?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| ExtractionError::Decode {
            reason: "audio file contains no default track".to_string(),
        })?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ExtractionError::Decode {
            reason: "track missing sample rate".to_string(),
        })?;
    // MPEG frame counts are estimated from the byte length, PCM counts are exact
    let mpeg_audio = is_mpeg_audio(track.codec_params.codec);
    let declared_frames = if mpeg_audio {
        None
    } else {
        track.codec_params.n_frames
    };

    if mpeg_audio {
        if let Some(cut) = find_truncated_frame(bytes) {
            return Err(ExtractionError::Decode {
                reason: format!(
                    "stream truncated: frame at byte {} needs {} bytes, {} available",
                    cut.offset, cut.frame_len, cut.available
                ),
            });
        }
    }

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| ExtractionError::Decode {
            reason: format!("failed to create decoder: {}", err),
        })?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(err) => {
                return Err(ExtractionError::Decode {
                    reason: format!("failed to read audio packet: {}", err),
                })
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buffer = decoder
            .decode(&packet)
            .map_err(|err| ExtractionError::Decode {
                reason: format!("failed to decode audio packet: {}", err),
            })?;

        let spec = *audio_buffer.spec();
        let channels = spec.channels.count();
        if channels == 0 || audio_buffer.frames() == 0 {
            continue;
        }

        let mut sample_buffer = SampleBuffer::<f32>::new(audio_buffer.capacity() as u64, spec);
        sample_buffer.copy_interleaved_ref(audio_buffer);

        samples.extend(
            sample_buffer
                .samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if let Some(expected) = declared_frames {
        if (samples.len() as u64) < expected {
            return Err(ExtractionError::Decode {
                reason: format!(
                    "stream truncated: decoded {} of {} frames",
                    samples.len(),
                    expected
                ),
            });
        }
    }

    tracing::debug!(
        "[Decoder] Decoded {} frames at {} Hz",
        samples.len(),
        sample_rate
    );

    Waveform::new(samples, sample_rate)
}

/// Decode an audio file from disk, using its extension as the probe hint
pub fn decode_file(path: &Path) -> Result<Waveform, ExtractionError> {
    let bytes = fs::read(path).map_err(|err| ExtractionError::Decode {
        reason: format!("failed to read {}: {}", path.display(), err),
    })?;
    let extension = path.extension().and_then(|ext| ext.to_str());
    decode_bytes(&bytes, extension)
}
