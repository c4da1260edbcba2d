// Feature extraction error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Extraction error code constants
///
/// Error code range: 3001-3004
pub struct ExtractionErrorCodes {}

impl ExtractionErrorCodes {
    /// Uploaded bytes could not be parsed as a supported audio container
    pub const DECODE: i32 = 3001;

    /// Waveform has zero length (or only zero-valued samples) after decoding
    pub const EMPTY_AUDIO: i32 = 3002;

    /// Resize or channel replication produced an unexpected tensor shape
    pub const SHAPE_MISMATCH: i32 = 3003;

    /// Extractor configuration was rejected
    pub const INVALID_CONFIG: i32 = 3004;
}

/// Log an extraction error with structured context
///
/// Logs the numeric code, the failing component and the displayable message
/// so failed uploads can be traced without re-running them.
pub fn log_extraction_error(err: &ExtractionError, context: &str) {
    error!(
        "Extraction error in {}: code={}, component=FeatureExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while turning uploaded audio into feature tensors
///
/// Every variant is deterministic for a given input: retrying the same
/// upload reproduces the same error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Malformed, truncated or unsupported audio container
    Decode { reason: String },

    /// Zero-length signal (`samples == 0`) or an all-zero silent signal
    EmptyAudio { samples: usize },

    /// Tensor shape incompatible with the classifier input
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Extractor configuration failed validation
    InvalidConfig { reason: String },
}

impl ErrorCode for ExtractionError {
    fn code(&self) -> i32 {
        match self {
            ExtractionError::Decode { .. } => ExtractionErrorCodes::DECODE,
            ExtractionError::EmptyAudio { .. } => ExtractionErrorCodes::EMPTY_AUDIO,
            ExtractionError::ShapeMismatch { .. } => ExtractionErrorCodes::SHAPE_MISMATCH,
            ExtractionError::InvalidConfig { .. } => ExtractionErrorCodes::INVALID_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            ExtractionError::Decode { reason } => {
                format!("Failed to decode audio: {}", reason)
            }
            ExtractionError::EmptyAudio { samples: 0 } => {
                "Audio contains no samples after decoding".to_string()
            }
            ExtractionError::EmptyAudio { samples } => {
                format!("Audio is silent ({} samples, all zero)", samples)
            }
            ExtractionError::ShapeMismatch { expected, actual } => {
                format!(
                    "Feature tensor shape {:?} does not match expected {:?}",
                    actual, expected
                )
            }
            ExtractionError::InvalidConfig { reason } => {
                format!("Invalid extractor configuration: {}", reason)
            }
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExtractionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ExtractionError {}

impl From<symphonia::core::errors::Error> for ExtractionError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        ExtractionError::Decode {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ExtractionError {
    fn from(err: std::io::Error) -> Self {
        ExtractionError::Decode {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_codes() {
        assert_eq!(
            ExtractionError::Decode {
                reason: "test".to_string()
            }
            .code(),
            ExtractionErrorCodes::DECODE
        );
        assert_eq!(
            ExtractionError::EmptyAudio { samples: 0 }.code(),
            ExtractionErrorCodes::EMPTY_AUDIO
        );
        assert_eq!(
            ExtractionError::ShapeMismatch {
                expected: vec![64, 64, 3],
                actual: vec![64, 64, 1],
            }
            .code(),
            ExtractionErrorCodes::SHAPE_MISMATCH
        );
        assert_eq!(
            ExtractionError::InvalidConfig {
                reason: "test".to_string()
            }
            .code(),
            ExtractionErrorCodes::INVALID_CONFIG
        );
    }

    #[test]
    fn test_empty_audio_messages_distinguish_silence() {
        let empty = ExtractionError::EmptyAudio { samples: 0 };
        assert_eq!(empty.message(), "Audio contains no samples after decoding");

        let silent = ExtractionError::EmptyAudio { samples: 512 };
        assert!(silent.message().contains("512 samples"));
        assert!(silent.message().contains("silent"));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = ExtractionError::ShapeMismatch {
            expected: vec![64, 64, 3],
            actual: vec![32, 32, 3],
        };
        assert_eq!(
            err.message(),
            "Feature tensor shape [32, 32, 3] does not match expected [64, 64, 3]"
        );
    }

    #[test]
    fn test_extraction_error_display() {
        let err = ExtractionError::Decode {
            reason: "truncated".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("ExtractionError"));
        assert!(display.contains("3001"));
        assert!(display.contains("truncated"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: ExtractionError = io_err.into();
        match err {
            ExtractionError::Decode { reason } => assert!(reason.contains("short read")),
            _ => panic!("Expected Decode"),
        }
    }
}
