// Audio module - decoding uploaded clips into mono waveforms

pub mod decoder;
pub mod mpeg;
pub mod waveform;

// Re-export commonly used types for convenience
pub use decoder::{decode_bytes, decode_file};
pub use waveform::{Waveform, MAX_SAMPLE_MAGNITUDE};
