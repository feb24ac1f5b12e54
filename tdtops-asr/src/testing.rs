//! Deterministic stub networks for unit tests.

use crate::error::ModelError;
use crate::traits::{Encoder, Joint, Predictor};
use crate::types::EncoderOutput;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Encoder output whose frame `t` holds the single value `t`.
pub fn indexed_frames(length: usize) -> EncoderOutput {
    let hidden = Array2::from_shape_fn((length, 1), |(t, _)| t as f32);
    EncoderOutput::new(hidden, length).unwrap()
}

/// Predictor whose state counts the calls made along the committed path.
///
/// Embedding is the label it was fed, so joints can see it.
#[derive(Debug, Default)]
pub struct CountingPredictor {
    /// Every `(label, state)` pair passed to `predict`
    pub seen: Vec<(usize, usize)>,
}

impl Predictor for CountingPredictor {
    type State = usize;
    type Embedding = usize;

    fn initial_state(&self) -> usize {
        0
    }

    fn predict(&mut self, label: usize, state: &usize) -> Result<(usize, usize), ModelError> {
        self.seen.push((label, *state));
        Ok((label, state + 1))
    }
}

/// A scripted joint decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub token: usize,
    pub duration_index: usize,
}

impl Decision {
    pub fn emit(token: usize, duration_index: usize) -> Self {
        Self {
            token,
            duration_index,
        }
    }

    pub fn blank(blank_id: usize) -> Self {
        Self::emit(blank_id, 0)
    }
}

/// Joint that plays back decisions chosen from `(call, frame)`.
pub struct ScriptedJoint<F> {
    pub blank_id: usize,
    pub num_durations: usize,
    pub calls: usize,
    pub frames: Vec<usize>,
    decide: F,
}

impl<F> ScriptedJoint<F>
where
    F: FnMut(usize, usize) -> Decision,
{
    pub fn new(blank_id: usize, num_durations: usize, decide: F) -> Self {
        Self {
            blank_id,
            num_durations,
            calls: 0,
            frames: Vec::new(),
            decide,
        }
    }
}

/// One-hot score vector for a decision.
pub fn one_hot(decision: Decision, blank_id: usize, num_durations: usize) -> Array1<f32> {
    let mut logits = Array1::zeros(blank_id + 1 + num_durations);
    logits[decision.token] = 1.0;
    logits[blank_id + 1 + decision.duration_index] = 1.0;
    logits
}

impl<E, F> Joint<E> for ScriptedJoint<F>
where
    F: FnMut(usize, usize) -> Decision,
{
    fn joint(&mut self, frame: ArrayView1<'_, f32>, _: &E) -> Result<Array1<f32>, ModelError> {
        let t = frame[0] as usize;
        let decision = (self.decide)(self.calls, t);
        self.calls += 1;
        self.frames.push(t);
        Ok(one_hot(decision, self.blank_id, self.num_durations))
    }
}

/// Joint returning fixed logits regardless of input.
pub struct FixedJoint(pub Array1<f32>);

impl<E> Joint<E> for FixedJoint {
    fn joint(&mut self, _: ArrayView1<'_, f32>, _: &E) -> Result<Array1<f32>, ModelError> {
        Ok(self.0.clone())
    }
}

/// Encoder that transposes features and subsamples by taking every
/// `factor`-th frame.
pub struct StrideEncoder {
    pub factor: usize,
    pub calls: usize,
}

impl Encoder for StrideEncoder {
    fn encode(
        &mut self,
        features: ArrayView2<'_, f32>,
        length: usize,
    ) -> Result<EncoderOutput, ModelError> {
        self.calls += 1;
        let frames = features.ncols().div_ceil(self.factor);
        let hidden = Array2::from_shape_fn((frames, features.nrows()), |(t, d)| {
            features[[d, t * self.factor]]
        });
        EncoderOutput::new(hidden, length.div_ceil(self.factor))
    }
}
