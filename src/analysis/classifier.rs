// Classifier - frozen-model inference over feature tensors
//
// Each feature family has its own pre-trained classifier. A classifier takes
// a single-element batch (1, 64, 64, 3) and returns one probability per
// species; the prediction is the first index holding the maximum
// probability and the confidence is that maximum.
//
// Classifier is a trait so any backend (a native CNN runtime, a remote
// service, a test double) can be plugged in. TemplateClassifier is the
// built-in backend: per-class template tensors scored by mean squared
// distance and turned into probabilities with a softmax.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::features::{ClassifierInput, FeatureTensor, InputDtype, TENSOR_SHAPE};
use crate::analysis::species::{species_for_class, Species, NUM_CLASSES};
use crate::error::{AnalysisError, InferenceError};

/// A frozen, read-only classification model
///
/// `predict` must not mutate the model so one instance can serve
/// concurrent requests.
pub trait Classifier: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Expected (height, width, channels) of a single input
    fn input_shape(&self) -> [usize; 3] {
        TENSOR_SHAPE
    }

    /// Probability vector for a (1, H, W, C) batch
    fn predict(&self, input: &ClassifierInput) -> Result<Vec<f32>, InferenceError>;
}

/// Decoded model output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// First index holding the maximum probability
    pub predicted_class_index: usize,
    /// Maximum probability, in [0, 1]
    pub confidence: f32,
}

impl PredictionResult {
    /// Decode a probability vector
    ///
    /// # Errors
    /// * `EmptyOutput` - no probabilities
    /// * `ClassCountMismatch` - length differs from the species catalog
    /// * `InvalidProbabilities` - a value is NaN, infinite or outside [0, 1]
    pub fn from_probabilities(model: &str, probabilities: &[f32]) -> Result<Self, InferenceError> {
        if probabilities.is_empty() {
            return Err(InferenceError::EmptyOutput {
                model: model.to_string(),
            });
        }
        if probabilities.len() != NUM_CLASSES {
            return Err(InferenceError::ClassCountMismatch {
                model: model.to_string(),
                expected: NUM_CLASSES,
                actual: probabilities.len(),
            });
        }
        if let Some((index, value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && (0.0..=1.0).contains(*p)))
        {
            return Err(InferenceError::InvalidProbabilities {
                model: model.to_string(),
                reason: format!("class {} has probability {}", index, value),
            });
        }

        // Strict comparison keeps the first maximum on ties
        let mut best = 0;
        for (index, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = index;
            }
        }

        Ok(Self {
            predicted_class_index: best,
            confidence: probabilities[best],
        })
    }

    pub fn species(&self) -> &'static Species {
        species_for_class(self.predicted_class_index)
    }
}

/// Check the tensor against the classifier's input shape, predict and decode
///
/// # Errors
/// * `Extraction(ShapeMismatch)` - tensor shape differs from `input_shape()`
/// * `Inference(..)` - backend failure or malformed output
pub fn run_inference(
    classifier: &dyn Classifier,
    tensor: &FeatureTensor,
    dtype: InputDtype,
) -> Result<PredictionResult, AnalysisError> {
    tensor.ensure_shape(classifier.input_shape())?;

    let batch = tensor.to_batch(dtype);
    let probabilities = classifier.predict(&batch)?;
    let prediction = PredictionResult::from_probabilities(classifier.name(), &probabilities)?;

    tracing::debug!(
        "[Classifier] {} ({:?}) -> class {} (confidence {:.4})",
        classifier.name(),
        tensor.family(),
        prediction.predicted_class_index,
        prediction.confidence
    );

    Ok(prediction)
}

fn default_input_shape() -> [usize; 3] {
    TENSOR_SHAPE
}

fn default_temperature() -> f32 {
    1.0
}

/// Template-matching classifier stored as JSON
///
/// ```json
/// { "name": "cnn_mfcc", "temperature": 50.0, "templates": [[...], ...] }
/// ```
///
/// Each template is a row-major (H, W, C) tensor. The score of class i is
/// `-mse(input, template_i) / temperature`; probabilities are the softmax of
/// the scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateClassifier {
    name: String,
    #[serde(default = "default_input_shape")]
    input_shape: [usize; 3],
    #[serde(default = "default_temperature")]
    temperature: f32,
    templates: Vec<Vec<f32>>,
}

impl TemplateClassifier {
    pub fn new(
        name: impl Into<String>,
        input_shape: [usize; 3],
        temperature: f32,
        templates: Vec<Vec<f32>>,
    ) -> Result<Self, InferenceError> {
        let classifier = Self {
            name: name.into(),
            input_shape,
            temperature,
            templates,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Build a classifier whose templates are the given tensors, in class order
    pub fn from_tensors(
        name: impl Into<String>,
        temperature: f32,
        tensors: &[FeatureTensor],
    ) -> Result<Self, InferenceError> {
        let input_shape = tensors.first().map(|t| t.shape()).unwrap_or(TENSOR_SHAPE);
        let templates = tensors.iter().map(|t| t.data().to_vec()).collect();
        Self::new(name, input_shape, temperature, templates)
    }

    /// Load a frozen model from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let load_error = |reason: String| InferenceError::ModelLoad {
            path: path.display().to_string(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|err| load_error(err.to_string()))?;
        let classifier: Self =
            serde_json::from_str(&contents).map_err(|err| load_error(err.to_string()))?;
        classifier.validate().map_err(|err| match err {
            InferenceError::ModelLoad { reason, .. } => load_error(reason),
            other => other,
        })?;

        log::info!(
            "[Classifier] Loaded {} from {:?} ({} classes)",
            classifier.name,
            path,
            classifier.templates.len()
        );
        Ok(classifier)
    }

    pub fn class_count(&self) -> usize {
        self.templates.len()
    }

    fn validate(&self) -> Result<(), InferenceError> {
        let invalid = |reason: String| {
            Err(InferenceError::ModelLoad {
                path: self.name.clone(),
                reason,
            })
        };

        if self.templates.is_empty() {
            return invalid("model has no class templates".to_string());
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return invalid(format!("temperature must be positive (got {})", self.temperature));
        }
        let expected_len: usize = self.input_shape.iter().product();
        for (class, template) in self.templates.iter().enumerate() {
            if template.len() != expected_len {
                return invalid(format!(
                    "template {} has {} values, expected {}",
                    class,
                    template.len(),
                    expected_len
                ));
            }
            if template.iter().any(|v| !v.is_finite()) {
                return invalid(format!("template {} contains non-finite values", class));
            }
        }
        if self.templates.len() != NUM_CLASSES {
            return invalid(format!(
                "model has {} class templates, expected {}",
                self.templates.len(),
                NUM_CLASSES
            ));
        }
        Ok(())
    }
}

impl Classifier for TemplateClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> [usize; 3] {
        self.input_shape
    }

    fn predict(&self, input: &ClassifierInput) -> Result<Vec<f32>, InferenceError> {
        let values = input.to_f32_vec();
        let expected_len: usize = self.input_shape.iter().product();
        if input.shape[0] != 1 || values.len() != expected_len {
            return Err(InferenceError::Backend {
                model: self.name.clone(),
                reason: format!(
                    "expected batch of shape (1, {:?}), got {:?}",
                    self.input_shape, input.shape
                ),
            });
        }

        let scores: Vec<f64> = self
            .templates
            .iter()
            .map(|template| {
                let mse = values
                    .iter()
                    .zip(template)
                    .map(|(&x, &t)| {
                        let d = (x - t) as f64;
                        d * d
                    })
                    .sum::<f64>()
                    / expected_len as f64;
                -mse / self.temperature as f64
            })
            .collect();

        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
        let total: f64 = exps.iter().sum();

        Ok(exps.iter().map(|e| (e / total) as f32).collect())
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
