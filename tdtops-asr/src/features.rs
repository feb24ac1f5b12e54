//! Feature matrix handling ahead of the encoder.
//!
//! Features are `[mel_bins, frames]` matrices produced elsewhere; this module
//! only pads them, predicts the encoder's output length, and reads raw dumps.

use crate::error::{ConfigError, Result};
use ndarray::{Array2, ArrayView2, s};
use std::path::Path;

/// Mel bins used by the Parakeet TDT encoders.
pub const TDT_MEL_BINS: usize = 128;

/// Encoder time down-sampling.
///
/// Each stage maps a length `L` to `floor((L + add) / divisor + offset)`,
/// and the encoder applies it `stages` times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubsamplingConfig {
    pub add: i64,
    pub divisor: i64,
    pub offset: i64,
    pub stages: u32,
}

impl SubsamplingConfig {
    /// FastConformer pre-encoder: three stride-2 convolutions (kernel 3, padding 1).
    pub const FASTCONFORMER: Self = Self {
        add: -1,
        divisor: 2,
        offset: 1,
        stages: 3,
    };

    /// Overall down-sampling factor (8 for FastConformer).
    pub fn factor(&self) -> usize {
        self.divisor.pow(self.stages) as usize
    }

    /// Encoded length for `frames` input frames.
    pub fn encoded_length(&self, frames: usize) -> usize {
        let length = (0..self.stages).fold(frames as i64, |length, _| {
            ((length + self.add).div_euclid(self.divisor) + self.offset).max(0)
        });

        length as usize
    }
}

impl Default for SubsamplingConfig {
    fn default() -> Self {
        Self::FASTCONFORMER
    }
}

/// Right-pad frames with zeros up to a multiple of `multiple`.
pub fn pad_frames(features: ArrayView2<'_, f32>, multiple: usize) -> Array2<f32> {
    let (mel_bins, frames) = features.dim();
    let padded = frames.div_ceil(multiple.max(1)) * multiple.max(1);

    let mut out = Array2::zeros((mel_bins, padded));
    out.slice_mut(s![.., ..frames]).assign(&features);
    out
}

/// Read a raw little-endian `f32` dump laid out `[mel_bins, frames]`.
pub fn read_features(path: impl AsRef<Path>, mel_bins: usize) -> Result<Array2<f32>> {
    let bytes = std::fs::read(path.as_ref())?;
    let features = features_from_bytes(&bytes, mel_bins)?;

    tracing::debug!(
        path = %path.as_ref().display(),
        mel_bins,
        frames = features.ncols(),
        "read features"
    );

    Ok(features)
}

fn features_from_bytes(bytes: &[u8], mel_bins: usize) -> Result<Array2<f32>> {
    let frame_bytes = mel_bins * size_of::<f32>();

    if mel_bins == 0 || bytes.len() % frame_bytes != 0 {
        return Err(ConfigError::FeatureShape {
            bytes: bytes.len(),
            mel_bins,
        }
        .into());
    }

    let values: Vec<f32> = bytes
        .chunks_exact(size_of::<f32>())
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let frames = values.len() / mel_bins;

    Ok(Array2::from_shape_vec((mel_bins, frames), values)?)
}
