//! Per-utterance decode state and its transitions.

use crate::types::{DecodeOutput, TokenDuration};

/// Outcome of one decode step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition<S> {
    /// Blank won: move to the next frame, drop the predictor output.
    Blank,
    /// A token won: emit it, commit `state`, and move `advance` frames.
    Emit {
        token_id: usize,
        duration: usize,
        advance: usize,
        state: S,
    },
}

/// Progress of one greedy decode.
///
/// Owned by a single `decode` call and consumed by [`DecodeState::finish`].
#[derive(Clone, Debug)]
pub struct DecodeState<S> {
    /// Current encoder frame `t`
    pub frame: usize,
    /// Label fed to the predictor on the next step
    pub last_label: usize,
    /// Last committed predictor state
    pub predictor_state: S,
    /// Emitted tokens
    pub tokens: Vec<TokenDuration>,
    /// Steps taken
    pub steps: usize,
}

impl<S> DecodeState<S> {
    /// Fresh state: frame 0, blank as the previous label.
    pub fn new(blank_id: usize, predictor_state: S) -> Self {
        Self {
            frame: 0,
            last_label: blank_id,
            predictor_state,
            tokens: Vec::new(),
            steps: 0,
        }
    }

    /// Whether another step may run for an utterance of `length` frames
    /// under a cap of `limit` steps.
    pub fn can_step(&self, length: usize, limit: usize) -> bool {
        self.frame < length && self.steps < limit
    }

    pub fn apply(&mut self, transition: Transition<S>) {
        self.steps += 1;

        match transition {
            Transition::Blank => self.frame += 1,
            Transition::Emit {
                token_id,
                duration,
                advance,
                state,
            } => {
                self.tokens
                    .push(TokenDuration::new(token_id, self.frame, duration));
                self.last_label = token_id;
                self.predictor_state = state;
                self.frame = self.frame.saturating_add(advance);
            }
        }
    }

    /// Close the decode of an utterance of `length` frames.
    pub fn finish(self, length: usize) -> DecodeOutput {
        DecodeOutput {
            tokens: self.tokens,
            truncated: self.frame < length,
            steps: self.steps,
            frame: self.frame,
        }
    }
}
