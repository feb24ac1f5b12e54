//! ONNX inference for the acoustic encoder.

use crate::error::ModelError;
use crate::traits::Encoder;
use crate::types::EncoderOutput;
use ndarray::prelude::*;
use ort::{inputs, session::Session, value::Tensor};

/// Encoder session with `audio_signal`/`length` inputs and
/// `outputs`/`encoded_lengths` outputs.
pub struct OrtEncoder {
    pub session: Session,
}

impl OrtEncoder {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl Encoder for OrtEncoder {
    fn encode(
        &mut self,
        features: ArrayView2<'_, f32>,
        length: usize,
    ) -> Result<EncoderOutput, ModelError> {
        let audio_signal = Tensor::from_array(features.to_owned().insert_axis(Axis(0)))?;
        let audio_length = Tensor::from_array(Array1::from_elem((1,), length as i64))?;

        let input_value = inputs!(
            "audio_signal" => audio_signal,
            "length" => audio_length,
        );

        let mut outputs = self.session.run(input_value)?;

        let encoder_outputs =
            outputs
                .remove("outputs")
                .ok_or_else(|| ModelError::MissingOutput {
                    name: "outputs".to_string(),
                })?;

        let encoded_lengths =
            outputs
                .remove("encoded_lengths")
                .ok_or_else(|| ModelError::MissingOutput {
                    name: "encoded_lengths".to_string(),
                })?;

        let encoder_outputs = encoder_outputs
            .try_extract_array::<f32>()?
            .to_owned()
            .into_dimensionality::<Ix3>()?;

        let encoded_length = encoded_lengths
            .try_extract_array::<i64>()?
            .first()
            .copied()
            .ok_or_else(|| ModelError::MissingOutput {
                name: "encoded_lengths[0]".to_string(),
            })?;

        tracing::trace!(
            shape = ?encoder_outputs.shape(),
            encoded_length,
            "encoder output"
        );

        EncoderOutput::from_channels_first(encoder_outputs, encoded_length)
    }
}
