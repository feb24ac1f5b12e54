//! Capability traits for the three transducer networks.
//!
//! The decoder never reaches into model sessions directly; it is handed
//! implementations of these traits. All methods take `&mut self` because ONNX
//! Runtime's `Session::run` requires it.

use crate::error::ModelError;
use crate::types::EncoderOutput;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Acoustic encoder: padded features to hidden vectors.
pub trait Encoder {
    /// Encode a `[mel_bins, frames]` feature matrix whose first `length`
    /// frames are valid.
    fn encode(
        &mut self,
        features: ArrayView2<'_, f32>,
        length: usize,
    ) -> Result<EncoderOutput, ModelError>;
}

/// Recurrent prediction network conditioned on the previous label.
pub trait Predictor {
    /// Recurrent state. Returned by value from every call and never mutated
    /// in place, so the caller decides whether to commit it.
    type State: Clone;

    /// Joint-ready embedding.
    type Embedding;

    /// State at the start of an utterance.
    fn initial_state(&self) -> Self::State;

    /// Run one step for `label` from `state`.
    fn predict(
        &mut self,
        label: usize,
        state: &Self::State,
    ) -> Result<(Self::Embedding, Self::State), ModelError>;
}

/// Joint network scoring one encoder frame against a predictor embedding.
pub trait Joint<E> {
    /// Raw score vector `[vocab.., blank, durations..]`.
    fn joint(&mut self, frame: ArrayView1<'_, f32>, embedding: &E)
    -> Result<Array1<f32>, ModelError>;
}
