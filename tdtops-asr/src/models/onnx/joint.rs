//! ONNX inference for the joint network.

use crate::error::ModelError;
use crate::traits::Joint;
use ndarray::prelude::*;
use ort::{inputs, session::Session, value::Tensor};

/// Joint network session taking one encoder frame `[1, D, 1]` and one
/// predictor embedding `[1, H, 1]`.
pub struct OrtJoint {
    pub session: Session,
    encoder_name: String,
    predictor_name: String,
    logits_name: String,
}

impl OrtJoint {
    pub fn new(session: Session) -> Result<Self, ModelError> {
        let [encoder_name, predictor_name] = match session.inputs.as_slice() {
            [encoder, predictor] => [encoder.name.clone(), predictor.name.clone()],
            inputs => {
                return Err(ModelError::InputCount {
                    expected: 2,
                    got: inputs.len(),
                });
            }
        };

        let logits_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ModelError::MissingOutput {
                name: "logits".to_string(),
            })?;

        Ok(Self {
            session,
            encoder_name,
            predictor_name,
            logits_name,
        })
    }
}

impl Joint<Array1<f32>> for OrtJoint {
    fn joint(
        &mut self,
        frame: ArrayView1<'_, f32>,
        embedding: &Array1<f32>,
    ) -> Result<Array1<f32>, ModelError> {
        let encoder_outputs = frame
            .to_owned()
            .into_shape_with_order((1, frame.len(), 1))?;
        let decoder_outputs = embedding
            .clone()
            .into_shape_with_order((1, embedding.len(), 1))?;

        let outputs = self.session.run(inputs![
            self.encoder_name.as_str() => Tensor::from_array(encoder_outputs)?,
            self.predictor_name.as_str() => Tensor::from_array(decoder_outputs)?,
        ])?;

        let logits: Array1<f32> = outputs[self.logits_name.as_str()]
            .try_extract_array::<f32>()?
            .iter()
            .copied()
            .collect();

        Ok(logits)
    }
}
