//! Error types for tdtops-asr organized by processing stage.

use ndarray::ShapeError;
use ndarray_stats::errors::MinMaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Decode pipeline error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Vocabulary loading error
    #[error(transparent)]
    Vocab(#[from] VocabError),

    /// Model evaluation error outside the decode loop
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Decode loop error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// IO error while reading features
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration errors (decode settings, feature layout).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Step multiplier must allow at least one step per frame
    #[error("invalid max step multiplier: {0} (minimum 1)")]
    InvalidStepMultiplier(usize),

    /// Duration table has no classes
    #[error("duration table is empty")]
    EmptyDurations,

    /// Feature dump does not divide into the requested mel bins
    #[error("feature dump of {bytes} bytes is not a whole number of {mel_bins}-bin f32 frames")]
    FeatureShape { bytes: usize, mel_bins: usize },
}

/// Vocabulary loading and discovery errors.
#[derive(Debug, Error)]
pub enum VocabError {
    /// File could not be read
    #[error("failed to read vocabulary {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File holds no pieces
    #[error("vocabulary {0:?} is empty")]
    Empty(PathBuf),

    /// No candidate file under the searched directory
    #[error("no vocabulary file found under {0:?}")]
    NotFound(PathBuf),
}

/// Model evaluation errors (ONNX, ndarray operations, output contracts).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing expected output tensor
    #[error("missing model output: {name}")]
    MissingOutput { name: String },

    /// Session lacks a required input
    #[error("missing model input: {name}")]
    MissingInput { name: String },

    /// Session has an input belonging to a different graph layout
    #[error("unexpected model input: {name}")]
    UnexpectedInput { name: String },

    /// Session exposes an unexpected number of inputs
    #[error("expected {expected} model inputs, found {got}")]
    InputCount { expected: usize, got: usize },

    /// Output tensor has the wrong size
    #[error("{name} has {got} elements, expected {expected}")]
    OutputShape {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Encoder reported a length outside its output
    #[error("encoded length {length} outside encoder output of {frames} frames")]
    InvalidLength { length: i64, frames: usize },

    /// ONNX Runtime error
    #[error(transparent)]
    Ort(#[from] ort::Error),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// ndarray-stats argmax error (empty or NaN scores)
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
}

/// Decode loop errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A predictor or joint evaluation broke its output contract
    #[error("contract violation at decode step {step}")]
    ContractViolation {
        step: usize,
        #[source]
        source: ModelError,
    },
}

/// Result type alias for tdtops-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// ort::Error → ModelError → Error
impl From<ort::Error> for Error {
    fn from(e: ort::Error) -> Self {
        Error::Model(ModelError::Ort(e))
    }
}

// ShapeError → ModelError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Model(ModelError::Shape(e))
    }
}
