// MPEG audio frame walk - truncation check for MP1/MP2/MP3 uploads
//
// MPEG audio has no reliable total frame count: without a Xing/Info header
// the demuxer estimates one from the byte length. Instead the stream is
// walked frame by frame using the lengths encoded in each frame header, and
// a final frame that extends past the end of the audio data marks the
// upload as truncated. Leading ID3v2 and trailing ID3v1/APEv2 tags are not
// audio and are skipped.

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;
const APE_FOOTER_LEN: usize = 32;
const APE_HAS_HEADER: u32 = 1 << 31;

/// A final MPEG frame cut short by the end of the upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedFrame {
    /// Byte offset of the frame header
    pub offset: usize,
    /// Frame length declared by the header
    pub frame_len: usize,
    /// Bytes present from the header to the end of the audio data
    pub available: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    I,
    II,
    III,
}

const BITRATES_V1: [[u32; 14]; 3] = [
    [32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
];
const BITRATES_V2_LAYER1: [u32; 14] = [32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
const BITRATES_V2_LAYER23: [u32; 14] = [8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// Frame length in bytes for a 4-byte MPEG audio header, None if the bytes
/// are not a header with a computable length (free-format included)
fn frame_len(header: &[u8]) -> Option<usize> {
    if header.len() < 4 || header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
        return None;
    }

    let version = match (header[1] >> 3) & 0b11 {
        0 => Version::Mpeg25,
        2 => Version::Mpeg2,
        3 => Version::Mpeg1,
        _ => return None,
    };
    let layer = match (header[1] >> 1) & 0b11 {
        1 => Layer::III,
        2 => Layer::II,
        3 => Layer::I,
        _ => return None,
    };
    let bitrate_index = (header[2] >> 4) as usize;
    if bitrate_index == 0 || bitrate_index == 15 {
        return None;
    }
    let kbps = match (version, layer) {
        (Version::Mpeg1, Layer::I) => BITRATES_V1[0][bitrate_index - 1],
        (Version::Mpeg1, Layer::II) => BITRATES_V1[1][bitrate_index - 1],
        (Version::Mpeg1, Layer::III) => BITRATES_V1[2][bitrate_index - 1],
        (_, Layer::I) => BITRATES_V2_LAYER1[bitrate_index - 1],
        _ => BITRATES_V2_LAYER23[bitrate_index - 1],
    };
    let base_rate = match (header[2] >> 2) & 0b11 {
        0 => 44_100,
        1 => 48_000,
        2 => 32_000,
        _ => return None,
    };
    let sample_rate = match version {
        Version::Mpeg1 => base_rate,
        Version::Mpeg2 => base_rate / 2,
        Version::Mpeg25 => base_rate / 4,
    };
    let padding = ((header[2] >> 1) & 1) as u32;
    let bitrate = kbps * 1_000;

    let len = match (version, layer) {
        (_, Layer::I) => (12 * bitrate / sample_rate + padding) * 4,
        (Version::Mpeg1, _) | (_, Layer::II) => 144 * bitrate / sample_rate + padding,
        _ => 72 * bitrate / sample_rate + padding,
    };
    Some(len as usize)
}

/// End of a leading ID3v2 tag, or 0 when there is none
fn id3v2_end(bytes: &[u8]) -> usize {
    if bytes.len() < ID3V2_HEADER_LEN || &bytes[..3] != b"ID3" {
        return 0;
    }
    // Synchsafe: 7 bits per byte
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize);
    let footer = if bytes[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
    (ID3V2_HEADER_LEN + size + footer).min(bytes.len())
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// End of the audio data once trailing ID3v1 and APEv2 tags are removed
fn audio_end(bytes: &[u8], start: usize) -> usize {
    let mut end = bytes.len();
    loop {
        let region = &bytes[start..end];
        if region.len() >= ID3V1_TAG_LEN && region[region.len() - ID3V1_TAG_LEN..].starts_with(b"TAG") {
            end -= ID3V1_TAG_LEN;
            continue;
        }
        if region.len() >= APE_FOOTER_LEN {
            let footer = &region[region.len() - APE_FOOTER_LEN..];
            if footer.starts_with(b"APETAGEX") {
                // Tag size covers the items and the footer, not the optional header
                let mut tag_len = read_u32_le(&footer[12..16]) as usize;
                if read_u32_le(&footer[20..24]) & APE_HAS_HEADER != 0 {
                    tag_len += APE_FOOTER_LEN;
                }
                if tag_len >= APE_FOOTER_LEN && tag_len <= region.len() {
                    end -= tag_len;
                    continue;
                }
            }
        }
        return end;
    }
}

/// Find a final frame cut short by the end of the upload
///
/// The walk stops without a verdict at the first position that is not a
/// frame header with a computable length, since junk between frames or
/// free-format streams cannot be measured.
pub fn find_truncated_frame(bytes: &[u8]) -> Option<TruncatedFrame> {
    let mut pos = id3v2_end(bytes);
    let end = audio_end(bytes, pos);

    while pos < end {
        let available = end - pos;
        if available < 4 {
            // A partial header is only a cut frame if it starts with sync
            return (bytes[pos] == 0xFF).then_some(TruncatedFrame {
                offset: pos,
                frame_len: 4,
                available,
            });
        }
        let len = frame_len(&bytes[pos..pos + 4])?;
        if len > available {
            return Some(TruncatedFrame {
                offset: pos,
                frame_len: len,
                available,
            });
        }
        pos += len;
    }
    None
}
