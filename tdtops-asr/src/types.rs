//! Core types for tdtops-asr

use crate::error::ModelError;
use eyre::{OptionExt, Result as EyreResult, WrapErr};
use hf_hub::CacheRepo;
use hf_hub::api::sync::ApiRepo;
use ndarray::{Array1, Array2, Array3, ArrayView1, Axis, s};
use ndarray_stats::QuantileExt;
use std::path::PathBuf;

/// Acoustic encoding of one utterance.
///
/// Hidden vectors are stored time-major (`[frames, dim]`). Only the first
/// `len()` frames are valid; the rest is encoder padding.
#[derive(Clone, Debug)]
pub struct EncoderOutput {
    hidden: Array2<f32>,
    length: usize,
}

impl EncoderOutput {
    /// Wrap time-major hidden vectors with their valid length.
    pub fn new(hidden: Array2<f32>, length: usize) -> Result<Self, ModelError> {
        if length > hidden.nrows() {
            return Err(ModelError::InvalidLength {
                length: length as i64,
                frames: hidden.nrows(),
            });
        }

        Ok(Self { hidden, length })
    }

    /// Build from an encoder tensor laid out `[batch=1, dim, frames]`.
    pub fn from_channels_first(outputs: Array3<f32>, length: i64) -> Result<Self, ModelError> {
        let frames = outputs.len_of(Axis(2));
        let length = usize::try_from(length)
            .map_err(|_| ModelError::InvalidLength { length, frames })?;

        let hidden = outputs
            .index_axis_move(Axis(0), 0)
            .reversed_axes()
            .as_standard_layout()
            .into_owned();

        Self::new(hidden, length)
    }

    /// Valid frame count `T`.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Hidden vector dimension.
    pub fn dim(&self) -> usize {
        self.hidden.ncols()
    }

    /// Total frames including padding.
    pub fn frames(&self) -> usize {
        self.hidden.nrows()
    }

    /// Hidden vector at frame `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t` is past the stored frames.
    pub fn frame(&self, t: usize) -> ArrayView1<'_, f32> {
        self.hidden.row(t)
    }
}

/// One joint-network evaluation split into its two segments.
///
/// The raw score vector is laid out `[vocab_0..vocab_n, blank, duration_0..duration_k]`.
#[derive(Clone, Debug)]
pub struct JointScore {
    logits: Array1<f32>,
    blank_id: usize,
}

impl JointScore {
    /// Split a raw score vector, rejecting any length other than
    /// `blank_id + 1 + num_durations`.
    pub fn split(
        logits: Array1<f32>,
        blank_id: usize,
        num_durations: usize,
    ) -> Result<Self, ModelError> {
        let expected = blank_id + 1 + num_durations;

        if logits.len() != expected {
            return Err(ModelError::OutputShape {
                name: "joint logits".to_string(),
                expected,
                got: logits.len(),
            });
        }

        Ok(Self { logits, blank_id })
    }

    /// Vocabulary + blank segment, indices `[0, blank_id]`.
    pub fn token_logits(&self) -> ArrayView1<'_, f32> {
        self.logits.slice(s![..=self.blank_id])
    }

    /// Duration class segment.
    pub fn duration_logits(&self) -> ArrayView1<'_, f32> {
        self.logits.slice(s![self.blank_id + 1..])
    }

    /// Highest scoring label; the first of equal maxima wins.
    pub fn best_token(&self) -> Result<usize, ModelError> {
        Ok(self.token_logits().argmax()?)
    }

    /// Highest scoring duration class; the first of equal maxima wins.
    pub fn best_duration(&self) -> Result<usize, ModelError> {
        Ok(self.duration_logits().argmax()?)
    }
}

/// Token with timing information from TDT decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDuration {
    /// Token ID (not blank)
    pub token_id: usize,
    /// Encoder frame index where token was emitted
    pub frame_index: usize,
    /// Duration prediction (number of frames to skip)
    pub duration: usize,
}

impl TokenDuration {
    pub fn new(token_id: usize, frame_index: usize, duration: usize) -> Self {
        Self {
            token_id,
            frame_index,
            duration,
        }
    }
}

/// Result of decoding one utterance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeOutput {
    /// Emitted tokens in order
    pub tokens: Vec<TokenDuration>,
    /// Step cap reached before the frame pointer passed the utterance
    pub truncated: bool,
    /// Decode steps taken
    pub steps: usize,
    /// Final frame pointer
    pub frame: usize,
}

impl DecodeOutput {
    pub fn token_ids(&self) -> Vec<usize> {
        self.tokens.iter().map(|td| td.token_id).collect()
    }
}

/// Text segment with timestamps.
///
/// Represents a portion of transcribed text with start and end times in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Transcribed text
    pub text: String,
    /// Start time in seconds
    pub start: f32,
    /// End time in seconds
    pub end: f32,
}

/// Assembled transcript of one utterance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<Segment>,
    /// Decoding stopped at the step cap; `text` is partial
    pub truncated: bool,
}

/// Model repository sources.
#[derive(Debug)]
pub enum ModelRepo {
    /// Local filesystem path
    Path(PathBuf),
    /// HuggingFace cache repository
    Cache(CacheRepo),
    /// HuggingFace API repository
    Api(ApiRepo),
}

impl ModelRepo {
    /// Resolve a file name to its full path in this repository.
    pub fn resolve(&self, file_name: &str) -> EyreResult<PathBuf> {
        match self {
            ModelRepo::Path(path) => path
                .join(file_name)
                .canonicalize()
                .wrap_err(format!("failed to resolve model: {file_name}")),
            ModelRepo::Cache(cache_repo) => cache_repo
                .get(file_name)
                .ok_or_eyre(format!("model not found in cache: {file_name}")),
            ModelRepo::Api(api_repo) => api_repo
                .get(file_name)
                .wrap_err(format!("failed to download from api: {file_name}")),
        }
    }

    /// Try resolving multiple file names, return first successful match.
    pub fn resolve_any(&self, candidates: &[&str]) -> EyreResult<PathBuf> {
        candidates
            .iter()
            .find_map(|name| self.resolve(name).ok())
            .ok_or_eyre(format!("no model found from candidates: {candidates:?}"))
    }
}
