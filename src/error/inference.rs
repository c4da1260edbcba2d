// Inference error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Inference error code constants
///
/// Error code range: 4001-4005
pub struct InferenceErrorCodes {}

impl InferenceErrorCodes {
    /// Model file could not be read or parsed
    pub const MODEL_LOAD: i32 = 4001;

    /// Classifier returned no probabilities
    pub const EMPTY_OUTPUT: i32 = 4002;

    /// Classifier returned a probability vector of the wrong length
    pub const CLASS_COUNT_MISMATCH: i32 = 4003;

    /// Probabilities were non-finite or outside [0, 1]
    pub const INVALID_PROBABILITIES: i32 = 4004;

    /// Classifier backend failed while running `predict`
    pub const BACKEND: i32 = 4005;
}

/// Log an inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!(
        "Inference error in {}: code={}, component=Classifier, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Inference-related errors
///
/// These cover loading a frozen model and decoding its output. A failed
/// prediction never mutates the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Model file missing or malformed
    ModelLoad { path: String, reason: String },

    /// Empty probability vector
    EmptyOutput { model: String },

    /// Probability vector length differs from the species catalog
    ClassCountMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    /// NaN, infinite or out-of-range probability
    InvalidProbabilities { model: String, reason: String },

    /// Backend failure during `predict`
    Backend { model: String, reason: String },
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::ModelLoad { .. } => InferenceErrorCodes::MODEL_LOAD,
            InferenceError::EmptyOutput { .. } => InferenceErrorCodes::EMPTY_OUTPUT,
            InferenceError::ClassCountMismatch { .. } => InferenceErrorCodes::CLASS_COUNT_MISMATCH,
            InferenceError::InvalidProbabilities { .. } => {
                InferenceErrorCodes::INVALID_PROBABILITIES
            }
            InferenceError::Backend { .. } => InferenceErrorCodes::BACKEND,
        }
    }

    fn message(&self) -> String {
        match self {
            InferenceError::ModelLoad { path, reason } => {
                format!("Failed to load model {}: {}", path, reason)
            }
            InferenceError::EmptyOutput { model } => {
                format!("Model {} returned no probabilities", model)
            }
            InferenceError::ClassCountMismatch {
                model,
                expected,
                actual,
            } => {
                format!(
                    "Model {} returned {} classes, expected {}",
                    model, actual, expected
                )
            }
            InferenceError::InvalidProbabilities { model, reason } => {
                format!("Model {} returned invalid probabilities: {}", model, reason)
            }
            InferenceError::Backend { model, reason } => {
                format!("Model {} failed to predict: {}", model, reason)
            }
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InferenceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InferenceError {}
