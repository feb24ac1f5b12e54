//! Greedy TDT decode loop.

use crate::config::DecodeConfig;
use crate::decoder::state::{DecodeState, Transition};
use crate::error::{DecodeError, ModelError, Result};
use crate::traits::{Joint, Predictor};
use crate::types::{DecodeOutput, EncoderOutput, JointScore};

/// Greedy Token-and-Duration Transducer decoder.
///
/// Each step queries the predictor with the last emitted label, scores the
/// current frame with the joint network, then either moves one frame on a
/// blank or emits a token and skips ahead by its predicted duration. The loop
/// stops once the frame pointer passes the utterance or the step cap
/// (`length * max_step_multiplier`) is reached.
#[derive(Clone, Debug)]
pub struct TdtDecoder {
    blank_id: usize,
    config: DecodeConfig,
}

impl TdtDecoder {
    /// Create a decoder for a model whose blank label is `blank_id`.
    pub fn new(blank_id: usize, config: DecodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { blank_id, config })
    }

    pub fn blank_id(&self) -> usize {
        self.blank_id
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode one utterance.
    ///
    /// A predictor or joint failure aborts the utterance with
    /// [`DecodeError::ContractViolation`] carrying the 1-based step. Hitting
    /// the step cap is not an error; the output is marked `truncated`.
    pub fn decode<P, J>(
        &self,
        encoded: &EncoderOutput,
        predictor: &mut P,
        joint: &mut J,
    ) -> Result<DecodeOutput>
    where
        P: Predictor,
        J: Joint<P::Embedding>,
    {
        let length = encoded.len();

        if length == 0 {
            tracing::debug!("empty utterance, skipping decode");
            return Ok(DecodeOutput::default());
        }

        let limit = self.config.step_limit(length);
        let mut state = DecodeState::new(self.blank_id, predictor.initial_state());

        while state.can_step(length, limit) {
            let transition = self
                .step(encoded, predictor, joint, &state)
                .map_err(|source| DecodeError::ContractViolation {
                    step: state.steps + 1,
                    source,
                })?;

            state.apply(transition);
        }

        let output = state.finish(length);

        if output.truncated {
            tracing::warn!(
                length,
                frame = output.frame,
                steps = output.steps,
                "step cap reached, transcript is partial"
            );
        }

        tracing::debug!(
            length,
            steps = output.steps,
            tokens = output.tokens.len(),
            "decode finished"
        );

        Ok(output)
    }

    fn step<P, J>(
        &self,
        encoded: &EncoderOutput,
        predictor: &mut P,
        joint: &mut J,
        state: &DecodeState<P::State>,
    ) -> std::result::Result<Transition<P::State>, ModelError>
    where
        P: Predictor,
        J: Joint<P::Embedding>,
    {
        let frame_index = state.frame;

        let (embedding, next_state) = predictor.predict(state.last_label, &state.predictor_state)?;

        let logits = joint.joint(encoded.frame(frame_index), &embedding)?;
        let score = JointScore::split(logits, self.blank_id, self.config.durations.len())?;

        let token_id = score.best_token()?;

        if token_id == self.blank_id {
            tracing::trace!(frame_index, "blank");
            return Ok(Transition::Blank);
        }

        let duration_index = score.best_duration()?;
        let duration = self.config.durations[duration_index];
        let advance = self.config.advance(duration);

        tracing::trace!(frame_index, token_id, duration, advance, "emit");

        Ok(Transition::Emit {
            token_id,
            duration,
            advance,
            state: next_state,
        })
    }
}
