// Types module - Data structures for feature matrices and tensors
//
// This module defines the core data structures used throughout the feature
// extraction pipeline: 2-D feature matrices (feature axis x time axis) and
// the fixed 64x64x3 tensors handed to the classifiers.

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Height of the classifier input image (feature axis after resize)
pub const TENSOR_HEIGHT: usize = 64;
/// Width of the classifier input image (time axis after resize)
pub const TENSOR_WIDTH: usize = 64;
/// Number of identical channels in the classifier input
pub const TENSOR_CHANNELS: usize = 3;
/// Expected (height, width, channels) of every feature tensor
pub const TENSOR_SHAPE: [usize; 3] = [TENSOR_HEIGHT, TENSOR_WIDTH, TENSOR_CHANNELS];

/// Largest magnitude representable in the 8-bit image domain
pub const MAX_PIXEL_MAGNITUDE: f32 = 255.0;

/// Feature family a tensor was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    Mfcc,
    MelSpectrogram,
}

/// Element type of the batch passed to a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputDtype {
    #[default]
    Float32,
    /// Values rounded and saturated to 0..=255
    Uint8,
}

/// Row-major 2-D matrix
///
/// Rows index the feature axis (frequency bin, mel band or cepstral
/// coefficient); columns index time frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    /// Wrap row-major data, checking that it matches `rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, ExtractionError> {
        if data.len() != rows * cols {
            return Err(ExtractionError::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![data.len()],
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Wrap data whose length is known to equal `rows * cols`
    pub(crate) fn from_raw(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Largest element (`-inf` for an empty matrix)
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Smallest element (`+inf` for an empty matrix)
    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// Fixed-shape image-like tensor (height x width x channels, channels last)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    family: FeatureFamily,
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl FeatureTensor {
    /// Replicate a single-channel image into `TENSOR_CHANNELS` identical channels
    ///
    /// # Errors
    /// `ShapeMismatch` if the image is not `TENSOR_HEIGHT x TENSOR_WIDTH`.
    pub fn from_grayscale(
        family: FeatureFamily,
        image: &FeatureMatrix,
    ) -> Result<Self, ExtractionError> {
        if image.shape() != [TENSOR_HEIGHT, TENSOR_WIDTH] {
            return Err(ExtractionError::ShapeMismatch {
                expected: TENSOR_SHAPE.to_vec(),
                actual: vec![image.rows(), image.cols(), 1],
            });
        }

        let data: Vec<f32> = image
            .data()
            .iter()
            .flat_map(|&value| [value; TENSOR_CHANNELS])
            .collect();

        let tensor = Self {
            family,
            height: TENSOR_HEIGHT,
            width: TENSOR_WIDTH,
            channels: TENSOR_CHANNELS,
            data,
        };
        tensor.ensure_shape(TENSOR_SHAPE)?;
        Ok(tensor)
    }

    /// Check the tensor against an expected (height, width, channels)
    pub fn ensure_shape(&self, expected: [usize; 3]) -> Result<(), ExtractionError> {
        let actual = self.shape();
        if actual != expected || self.data.len() != expected.iter().product::<usize>() {
            return Err(ExtractionError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }

    pub fn family(&self) -> FeatureFamily {
        self.family
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize, channel: usize) -> f32 {
        self.data[(row * self.width + col) * self.channels + channel]
    }

    /// Copy out one channel as a row-major `height x width` plane
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Divide every value by the maximum 8-bit magnitude
    pub fn normalized(mut self) -> Self {
        for value in &mut self.data {
            *value /= MAX_PIXEL_MAGNITUDE;
        }
        self
    }

    /// Wrap the tensor as a single-element batch of shape (1, H, W, C)
    pub fn to_batch(&self, dtype: InputDtype) -> ClassifierInput {
        let data = match dtype {
            InputDtype::Float32 => InputData::Float32(self.data.clone()),
            InputDtype::Uint8 => InputData::Uint8(
                self.data
                    .iter()
                    .map(|&v| v.round().clamp(0.0, MAX_PIXEL_MAGNITUDE) as u8)
                    .collect(),
            ),
        };
        ClassifierInput {
            shape: [1, self.height, self.width, self.channels],
            data,
        }
    }

    /// Mean of all elements
    pub fn mean(&self) -> f32 {
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }
}

/// Batch tensor element storage
#[derive(Debug, Clone, PartialEq)]
pub enum InputData {
    Float32(Vec<f32>),
    Uint8(Vec<u8>),
}

/// 4-D batch (batch, height, width, channels) handed to `Classifier::predict`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInput {
    pub shape: [usize; 4],
    pub data: InputData,
}

impl ClassifierInput {
    pub fn len(&self) -> usize {
        match &self.data {
            InputData::Float32(values) => values.len(),
            InputData::Uint8(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> InputDtype {
        match self.data {
            InputData::Float32(_) => InputDtype::Float32,
            InputData::Uint8(_) => InputDtype::Uint8,
        }
    }

    /// Element values widened to f32 regardless of storage type
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.data {
            InputData::Float32(values) => values.clone(),
            InputData::Uint8(values) => values.iter().map(|&v| v as f32).collect(),
        }
    }
}
