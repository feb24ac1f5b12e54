//! Encoder self-check over random feature matrices.
//!
//! Runs the encoder on a fixed set of frame counts and compares the reported
//! encoded length against the subsampling formula.

use crate::features::SubsamplingConfig;
use crate::traits::Encoder;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Frame counts exercised by default, covering aligned and ragged inputs.
pub const VERIFY_FRAME_COUNTS: [usize; 7] = [64, 128, 280, 305, 312, 500, 1024];

#[derive(Clone, Debug, PartialEq)]
pub enum CaseOutcome {
    Passed {
        frames_out: usize,
        dim: usize,
        encoded_length: usize,
    },
    LengthMismatch {
        expected: usize,
        got: usize,
    },
    /// Encoder returned an error, kept as its rendered message
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseReport {
    pub frames: usize,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed { .. })
    }
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CaseOutcome::Passed {
                frames_out,
                dim,
                encoded_length,
            } => write!(
                f,
                "{:>5} frames: ok ({frames_out} x {dim}, length {encoded_length})",
                self.frames
            ),
            CaseOutcome::LengthMismatch { expected, got } => write!(
                f,
                "{:>5} frames: length mismatch (expected {expected}, got {got})",
                self.frames
            ),
            CaseOutcome::Failed(message) => {
                write!(f, "{:>5} frames: failed ({message})", self.frames)
            }
        }
    }
}

/// Run `encoder` once per entry of `frame_counts` with uniform noise in
/// `[-1, 1)`.
///
/// Failures are collected per case rather than aborting the run.
pub fn verify_encoder<E: Encoder>(
    encoder: &mut E,
    mel_bins: usize,
    frame_counts: &[usize],
    subsampling: SubsamplingConfig,
    seed: u64,
) -> Vec<CaseReport> {
    let mut rng = StdRng::seed_from_u64(seed);

    frame_counts
        .iter()
        .map(|&frames| {
            let features =
                Array2::from_shape_simple_fn((mel_bins, frames), || rng.gen_range(-1.0f32..1.0));

            let outcome = match encoder.encode(features.view(), frames) {
                Ok(output) => {
                    let expected = subsampling.encoded_length(frames);
                    if output.len() == expected {
                        CaseOutcome::Passed {
                            frames_out: output.frames(),
                            dim: output.dim(),
                            encoded_length: output.len(),
                        }
                    } else {
                        CaseOutcome::LengthMismatch {
                            expected,
                            got: output.len(),
                        }
                    }
                }
                Err(e) => CaseOutcome::Failed(e.to_string()),
            };

            let report = CaseReport { frames, outcome };
            if report.passed() {
                tracing::debug!(%report, "encoder case");
            } else {
                tracing::warn!(%report, "encoder case");
            }

            report
        })
        .collect()
}
