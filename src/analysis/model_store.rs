// Model store - loads the two frozen classifiers once at startup
//
// A model directory holds one file per feature family. The pair is loaded
// eagerly and shared read-only by every request.

use std::path::Path;

use crate::analysis::classifier::{Classifier, TemplateClassifier};
use crate::error::InferenceError;

/// File name of the MFCC classifier inside a model directory
pub const MFCC_MODEL_FILE: &str = "cnn_mfcc.json";
/// File name of the mel-spectrogram classifier inside a model directory
pub const MELSPEC_MODEL_FILE: &str = "cnn_melspec.json";

/// One classifier per feature family
pub struct ModelPair {
    pub mfcc: Box<dyn Classifier>,
    pub melspec: Box<dyn Classifier>,
}

impl ModelPair {
    pub fn new(mfcc: Box<dyn Classifier>, melspec: Box<dyn Classifier>) -> Self {
        Self { mfcc, melspec }
    }
}

pub struct ModelStore;

impl ModelStore {
    /// Load both template classifiers from `dir`
    ///
    /// # Errors
    /// `ModelLoad` naming the first file that is missing or invalid.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<ModelPair, InferenceError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(InferenceError::ModelLoad {
                path: dir.display().to_string(),
                reason: "model directory does not exist".to_string(),
            });
        }

        let mfcc = TemplateClassifier::load(dir.join(MFCC_MODEL_FILE))?;
        let melspec = TemplateClassifier::load(dir.join(MELSPEC_MODEL_FILE))?;

        log::info!("[ModelStore] Loaded classifiers from {:?}", dir);
        Ok(ModelPair::new(Box::new(mfcc), Box::new(melspec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::TENSOR_SHAPE;
    use std::fs;

    fn write_model(dir: &Path, file: &str, name: &str) {
        let len: usize = TENSOR_SHAPE.iter().product();
        let templates = (0..6).map(|i| vec![i as f32; len]).collect();
        let model = TemplateClassifier::new(name, TENSOR_SHAPE, 1.0, templates).unwrap();
        fs::write(dir.join(file), serde_json::to_string(&model).unwrap()).unwrap();
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), MFCC_MODEL_FILE, "cnn_mfcc");
        write_model(dir.path(), MELSPEC_MODEL_FILE, "cnn_melspec");

        let pair = ModelStore::load_dir(dir.path()).unwrap();
        assert_eq!(pair.mfcc.name(), "cnn_mfcc");
        assert_eq!(pair.melspec.name(), "cnn_melspec");
        assert_eq!(pair.mfcc.input_shape(), TENSOR_SHAPE);
    }

    #[test]
    fn test_missing_family_file() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path(), MFCC_MODEL_FILE, "cnn_mfcc");

        match ModelStore::load_dir(dir.path()) {
            Err(InferenceError::ModelLoad { path, .. }) => {
                assert!(path.ends_with(MELSPEC_MODEL_FILE))
            }
            Err(other) => panic!("Expected ModelLoad, got {:?}", other),
            Ok(_) => panic!("Expected ModelLoad error"),
        }
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            ModelStore::load_dir("no/such/models"),
            Err(InferenceError::ModelLoad { .. })
        ));
    }
}
