// Error types for the bird-call classifier
//
// This module defines custom error types for feature extraction and inference,
// providing structured error handling with error codes suitable for display
// by the presentation layer.

mod extraction;
mod inference;

pub use extraction::{log_extraction_error, ExtractionError, ExtractionErrorCodes};
pub use inference::{log_inference_error, InferenceError, InferenceErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the upload boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Failure of a full upload analysis (extraction followed by inference)
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    Extraction(ExtractionError),
    Inference(InferenceError),
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::Extraction(err) => err.code(),
            AnalysisError::Inference(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::Extraction(err) => err.message(),
            AnalysisError::Inference(err) => err.message(),
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Extraction(err) => err.fmt(f),
            AnalysisError::Inference(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::Extraction(err) => Some(err),
            AnalysisError::Inference(err) => Some(err),
        }
    }
}

impl From<ExtractionError> for AnalysisError {
    fn from(err: ExtractionError) -> Self {
        AnalysisError::Extraction(err)
    }
}

impl From<InferenceError> for AnalysisError {
    fn from(err: InferenceError) -> Self {
        AnalysisError::Inference(err)
    }
}
