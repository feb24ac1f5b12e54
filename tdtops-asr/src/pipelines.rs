//! High-level decode pipelines.

use crate::config::DecodeConfig;
use crate::decoder::TdtDecoder;
use crate::error::Result;
use crate::features::{SubsamplingConfig, pad_frames};
use crate::models::onnx::{FusedPredictor, OrtEncoder, OrtFusedJoint, OrtJoint, OrtPredictor};
use crate::traits::{Encoder, Joint, Predictor};
use crate::types::{DecodeOutput, ModelRepo, Segment, Transcription};
use crate::vocab::{EXPECTED_VOCAB_SIZE, VOCAB_FILE, Vocabulary, find_vocab};
use eyre::{Result as EyreResult, WrapErr};
use ndarray::ArrayView2;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::path::{Path, PathBuf};

/// Mel hop length of the Parakeet feature extractor.
pub const HOP_LENGTH: usize = 160;

/// Sample rate the Parakeet models are trained on.
pub const SAMPLE_RATE: usize = 16_000;

/// Features in, transcript out.
///
/// Owns one implementation of each network, so a pipeline decodes one
/// utterance at a time.
pub struct TdtPipeline<E, P, J> {
    pub encoder: E,
    pub predictor: P,
    pub joint: J,
    vocabulary: Vocabulary,
    decoder: TdtDecoder,
    subsampling: SubsamplingConfig,
}

impl<E, P, J> TdtPipeline<E, P, J>
where
    E: Encoder,
    P: Predictor,
    J: Joint<P::Embedding>,
{
    /// The blank id is derived from the vocabulary size.
    pub fn new(
        encoder: E,
        predictor: P,
        joint: J,
        vocabulary: Vocabulary,
        config: DecodeConfig,
    ) -> Result<Self> {
        let decoder = TdtDecoder::new(vocabulary.blank_id(), config)?;

        Ok(Self {
            encoder,
            predictor,
            joint,
            vocabulary,
            decoder,
            subsampling: SubsamplingConfig::default(),
        })
    }

    pub fn with_subsampling(mut self, subsampling: SubsamplingConfig) -> Self {
        self.subsampling = subsampling;
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn decoder(&self) -> &TdtDecoder {
        &self.decoder
    }

    /// Decode a `[mel_bins, frames]` feature matrix to token ids.
    ///
    /// Frames are zero-padded to a multiple of the subsampling factor and the
    /// padded count is handed to the encoder as the valid length.
    pub fn decode(&mut self, features: ArrayView2<'_, f32>) -> Result<DecodeOutput> {
        if features.ncols() == 0 {
            return Ok(DecodeOutput::default());
        }

        let padded = pad_frames(features, self.subsampling.factor());
        let encoded = self.encoder.encode(padded.view(), padded.ncols())?;

        tracing::debug!(
            frames = features.ncols(),
            padded = padded.ncols(),
            encoded_length = encoded.len(),
            "encoded features"
        );

        self.decoder
            .decode(&encoded, &mut self.predictor, &mut self.joint)
    }

    /// Decode and assemble a transcript with per-token timings.
    pub fn transcribe(&mut self, features: ArrayView2<'_, f32>) -> Result<Transcription> {
        let output = self.decode(features)?;

        let segments = output
            .tokens
            .iter()
            .filter_map(|td| {
                self.vocabulary.token_text(td.token_id).map(|text| Segment {
                    text,
                    start: self.frame_to_secs(td.frame_index),
                    end: self.frame_to_secs(td.frame_index.saturating_add(td.duration)),
                })
            })
            .collect();

        Ok(Transcription {
            text: self.vocabulary.assemble_tokens(&output.tokens),
            segments,
            truncated: output.truncated,
        })
    }

    /// Encoder frame index to seconds.
    pub fn frame_to_secs(&self, frame: usize) -> f32 {
        frame as f32 * (self.subsampling.factor() * HOP_LENGTH) as f32 / SAMPLE_RATE as f32
    }
}

const ENCODER_FILES: &[&str] = &["encoder.onnx", "encoder-model.onnx", "encoder.int8.onnx"];
const JOINER_FILES: &[&str] = &["joiner.onnx", "joint.onnx", "joiner.int8.onnx"];
const SPLIT_DECODER_FILES: &[&str] = &["decoder.onnx", "decoder-model.onnx", "decoder.int8.onnx"];
const FUSED_DECODER_FILES: &[&str] = &[
    "decoder_joint-model.onnx",
    "decoder_joint.onnx",
    "decoder_joint-model.int8.onnx",
    "decoder.onnx",
];

/// Parakeet TDT over separate decoder and joiner graphs.
pub type OrtTdt = TdtPipeline<OrtEncoder, OrtPredictor, OrtJoint>;

/// Parakeet TDT over a fused decoder + joint graph.
pub type OrtFusedTdt = TdtPipeline<OrtEncoder, FusedPredictor, OrtFusedJoint>;

/// Decoder graph files found in a model repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecoderLayout {
    /// Prediction and joint networks in their own graphs
    Split { decoder: PathBuf, joiner: PathBuf },
    /// One graph taking the encoder frame and returning joint logits
    Fused { decoder: PathBuf },
}

impl DecoderLayout {
    /// A joiner graph selects the split layout; otherwise the decoder graph
    /// is taken to be fused.
    pub fn detect(repo: &ModelRepo) -> EyreResult<Self> {
        match repo.resolve_any(JOINER_FILES) {
            Ok(joiner) => Ok(Self::Split {
                decoder: repo.resolve_any(SPLIT_DECODER_FILES)?,
                joiner,
            }),
            Err(_) => Ok(Self::Fused {
                decoder: repo.resolve_any(FUSED_DECODER_FILES)?,
            }),
        }
    }
}

/// ONNX pipeline for either decoder layout.
pub enum OrtTdtModel {
    Split(OrtTdt),
    Fused(OrtFusedTdt),
}

impl OrtTdtModel {
    /// Load the sessions and the vocabulary from a model repository.
    ///
    /// # Arguments
    ///
    /// * `repo` - Model repository (local path, HF cache, or HF API)
    /// * `session_builder` - ONNX session builder for configuring execution providers
    /// * `config` - Decode loop settings
    pub fn from_repo(
        repo: &ModelRepo,
        session_builder: SessionBuilder,
        config: DecodeConfig,
    ) -> EyreResult<Self> {
        let encoder_path = repo.resolve_any(ENCODER_FILES)?;
        let layout = DecoderLayout::detect(repo)?;

        tracing::info!(?layout, "resolved decoder graphs");

        let vocab_path = match repo {
            ModelRepo::Path(dir) => find_vocab(dir)?,
            _ => repo.resolve(VOCAB_FILE)?,
        };

        let vocabulary =
            Vocabulary::from_file(&vocab_path).wrap_err("failed to load vocabulary")?;
        vocabulary.check_size(EXPECTED_VOCAB_SIZE);

        let encoder = OrtEncoder::new(load_session(&session_builder, &encoder_path, "encoder")?);

        let model = match layout {
            DecoderLayout::Split { decoder, joiner } => {
                let predictor = OrtPredictor::new(load_session(&session_builder, &decoder, "decoder")?)
                    .wrap_err("unexpected decoder signature")?;
                let joint = OrtJoint::new(load_session(&session_builder, &joiner, "joiner")?)
                    .wrap_err("unexpected joiner signature")?;

                Self::Split(TdtPipeline::new(encoder, predictor, joint, vocabulary, config)?)
            }
            DecoderLayout::Fused { decoder } => {
                let joint = OrtFusedJoint::new(load_session(&session_builder, &decoder, "decoder")?)
                    .wrap_err("unexpected fused decoder signature")?;

                Self::Fused(TdtPipeline::new(
                    encoder,
                    FusedPredictor::new(),
                    joint,
                    vocabulary,
                    config,
                )?)
            }
        };

        Ok(model)
    }

    pub fn transcribe(&mut self, features: ArrayView2<'_, f32>) -> Result<Transcription> {
        match self {
            Self::Split(pipeline) => pipeline.transcribe(features),
            Self::Fused(pipeline) => pipeline.transcribe(features),
        }
    }
}

fn load_session(builder: &SessionBuilder, path: &Path, what: &str) -> EyreResult<Session> {
    builder
        .clone()
        .commit_from_file(path)
        .wrap_err_with(|| format!("failed to load {what} session"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, Error};
    use crate::testing::{CountingPredictor, Decision, FixedJoint, ScriptedJoint, StrideEncoder};
    use ndarray::{Array1, Array2};

    fn vocabulary() -> Vocabulary {
        ["▁hi", "▁there", "foo", "bar"].into_iter().collect()
    }

    /// Features whose encoded frame `t` holds `t` in every bin.
    fn features(frames: usize) -> Array2<f32> {
        Array2::from_shape_fn((2, frames), |(_, i)| (i / 8) as f32)
    }

    fn stride() -> StrideEncoder {
        StrideEncoder {
            factor: 8,
            calls: 0,
        }
    }

    #[test]
    fn transcribes_with_timings() {
        let blank = 4;
        let joint = ScriptedJoint::new(blank, 5, move |_, t| match t {
            0 => Decision::emit(0, 2),
            2 => Decision::emit(1, 1),
            _ => Decision::blank(blank),
        });

        let mut pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            joint,
            vocabulary(),
            DecodeConfig::default(),
        )
        .unwrap();

        let out = pipeline.transcribe(features(30).view()).unwrap();

        assert_eq!(out.text, "hi there");
        assert!(!out.truncated);
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[0].text, " hi");
        assert_eq!(out.segments[0].start, 0.0);
        assert_eq!(out.segments[0].end, 0.16);
        assert_eq!(out.segments[1].start, 0.16);
        assert_eq!(out.segments[1].end, 0.24);
        assert_eq!(pipeline.joint.frames, vec![0, 2, 3]);
    }

    #[test]
    fn max_duration_timing_does_not_overflow() {
        let blank = 4;
        let joint = ScriptedJoint::new(blank, 1, move |call, _| match call {
            0 => Decision::blank(blank),
            _ => Decision::emit(1, 0),
        });

        let mut pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            joint,
            vocabulary(),
            DecodeConfig::new(vec![usize::MAX]),
        )
        .unwrap();

        let out = pipeline.transcribe(features(24).view()).unwrap();

        assert_eq!(out.text, "there");
        assert!(!out.truncated);
        assert_eq!(out.segments[0].start, 0.08);
        assert_eq!(out.segments[0].end, pipeline.frame_to_secs(usize::MAX));
        assert!(out.segments[0].end.is_finite());
    }

    #[test]
    fn pads_before_encoding() {
        let mut pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            ScriptedJoint::new(4, 5, |_, _| Decision::blank(4)),
            vocabulary(),
            DecodeConfig::default(),
        )
        .unwrap();

        let out = pipeline.decode(features(17).view()).unwrap();

        // 17 frames pad to 24, which the stride encoder maps to 3
        assert_eq!(pipeline.joint.frames, vec![0, 1, 2]);
        assert_eq!(out.frame, 3);
        assert!(out.tokens.is_empty());
    }

    #[test]
    fn empty_features_skip_the_encoder() {
        let mut pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            FixedJoint(Array1::zeros(10)),
            vocabulary(),
            DecodeConfig::default(),
        )
        .unwrap();

        let out = pipeline.transcribe(Array2::zeros((2, 0)).view()).unwrap();

        assert_eq!(out, Transcription::default());
        assert_eq!(pipeline.encoder.calls, 0);
    }

    #[test]
    fn joint_width_must_match_vocabulary() {
        let mut pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            FixedJoint(Array1::zeros(1030)),
            vocabulary(),
            DecodeConfig::default(),
        )
        .unwrap();

        let err = pipeline.transcribe(features(8).view()).unwrap_err();

        assert!(matches!(
            err,
            Error::Decode(DecodeError::ContractViolation { step: 1, .. })
        ));
    }

    #[test]
    fn frame_timing_uses_subsampled_hop() {
        let pipeline = TdtPipeline::new(
            stride(),
            CountingPredictor::default(),
            FixedJoint(Array1::zeros(10)),
            vocabulary(),
            DecodeConfig::default(),
        )
        .unwrap();

        assert_eq!(pipeline.frame_to_secs(0), 0.0);
        assert_eq!(pipeline.frame_to_secs(100), 8.0);
    }

    fn touch(dir: &Path, files: &[&str]) -> ModelRepo {
        for file in files {
            std::fs::write(dir.join(file), b"").unwrap();
        }
        ModelRepo::Path(dir.to_path_buf())
    }

    #[test]
    fn joiner_selects_split_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = touch(dir.path(), &["encoder.onnx", "decoder.onnx", "joiner.onnx"]);

        assert_eq!(
            DecoderLayout::detect(&repo).unwrap(),
            DecoderLayout::Split {
                decoder: dir.path().join("decoder.onnx").canonicalize().unwrap(),
                joiner: dir.path().join("joiner.onnx").canonicalize().unwrap(),
            }
        );
    }

    #[test]
    fn missing_joiner_selects_fused_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = touch(dir.path(), &["encoder-model.onnx", "decoder_joint-model.onnx"]);

        assert_eq!(
            DecoderLayout::detect(&repo).unwrap(),
            DecoderLayout::Fused {
                decoder: dir.path().join("decoder_joint-model.onnx").canonicalize().unwrap(),
            }
        );
    }

    #[test]
    fn lone_decoder_is_taken_as_fused() {
        let dir = tempfile::tempdir().unwrap();
        let repo = touch(dir.path(), &["encoder.onnx", "decoder.onnx"]);

        assert!(matches!(
            DecoderLayout::detect(&repo).unwrap(),
            DecoderLayout::Fused { decoder } if decoder.ends_with("decoder.onnx")
        ));
    }

    #[test]
    fn joiner_without_decoder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = touch(dir.path(), &["joiner.onnx"]);

        assert!(DecoderLayout::detect(&repo).is_err());
    }
}
