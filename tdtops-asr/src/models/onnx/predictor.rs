//! ONNX inference for a standalone LSTM prediction network.

use super::{
    FUSED_ENCODER_INPUT, LstmState, flat_output, input_names, output_names, require_input,
    state_inputs, state_outputs, take_array3,
};
use crate::error::ModelError;
use crate::traits::Predictor;
use ndarray::prelude::*;
use ort::{inputs, session::Session, value::Tensor};

/// LSTM state shape `[layers, batch, hidden]` of the Parakeet TDT predictor.
pub const LSTM_STATE_SHAPE: (usize, usize, usize) = (2, 1, 640);

const TARGETS: &str = "targets";
const TARGET_LENGTH: &str = "target_length";

/// Input names of a standalone prediction graph.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PredictorInputs {
    targets: String,
    target_length: String,
    states: [String; 2],
}

impl PredictorInputs {
    /// Bind `targets` and `target_length` by name; the other two inputs are
    /// the states, in graph order. Fused decoder graphs are rejected.
    fn bind(names: &[String]) -> Result<Self, ModelError> {
        if let Some(name) = names.iter().find(|n| *n == FUSED_ENCODER_INPUT) {
            return Err(ModelError::UnexpectedInput { name: name.clone() });
        }

        Ok(Self {
            targets: require_input(names, TARGETS)?,
            target_length: require_input(names, TARGET_LENGTH)?,
            states: state_inputs(names, &[TARGETS, TARGET_LENGTH])?,
        })
    }
}

/// Prediction network session.
///
/// Takes `targets` `[1, 1]` (i32), `target_length` `[1]` (i32) and the two
/// LSTM states. The first output is the embedding (`[1, hidden, 1]`) and the
/// last two are the updated states. Exporters disagree on the state tensor
/// names, so they are read from the session.
pub struct OrtPredictor {
    pub session: Session,
    inputs: PredictorInputs,
    embedding_name: String,
    state_names: [String; 2],
    state_shape: (usize, usize, usize),
}

impl OrtPredictor {
    pub fn new(session: Session) -> Result<Self, ModelError> {
        let inputs = PredictorInputs::bind(&input_names(&session))?;

        let outputs = output_names(&session);
        let state_names = state_outputs(&outputs)?;
        let embedding_name = outputs[0].clone();

        Ok(Self {
            session,
            inputs,
            embedding_name,
            state_names,
            state_shape: LSTM_STATE_SHAPE,
        })
    }

    /// Override the LSTM state shape for models with a different predictor size.
    pub fn with_state_shape(mut self, shape: (usize, usize, usize)) -> Self {
        self.state_shape = shape;
        self
    }
}

impl Predictor for OrtPredictor {
    type State = LstmState;
    type Embedding = Array1<f32>;

    fn initial_state(&self) -> Self::State {
        (
            Array3::zeros(self.state_shape),
            Array3::zeros(self.state_shape),
        )
    }

    fn predict(
        &mut self,
        label: usize,
        state: &Self::State,
    ) -> Result<(Self::Embedding, Self::State), ModelError> {
        let targets = Tensor::from_array(Array2::from_elem((1, 1), label as i32))?;
        let target_length = Tensor::from_array(Array1::from_elem((1,), 1i32))?;
        let states_1 = Tensor::from_array(state.0.clone())?;
        let states_2 = Tensor::from_array(state.1.clone())?;

        let PredictorInputs {
            targets: targets_name,
            target_length: length_name,
            states: [states_1_name, states_2_name],
        } = &self.inputs;

        let mut outputs = self.session.run(inputs![
            targets_name.as_str() => targets,
            length_name.as_str() => target_length,
            states_1_name.as_str() => states_1,
            states_2_name.as_str() => states_2,
        ])?;

        let embedding = flat_output(&outputs, &self.embedding_name)?;

        let [state_1_name, state_2_name] = &self.state_names;
        let next_state = (
            take_array3(&mut outputs, state_1_name)?,
            take_array3(&mut outputs, state_2_name)?,
        );

        Ok((embedding, next_state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::onnx::names;

    #[test]
    fn binds_split_decoder_inputs() {
        let bound = PredictorInputs::bind(&names(&[
            "targets",
            "target_length",
            "states.1",
            "onnx::Slice_3",
        ]))
        .unwrap();

        assert_eq!(bound.targets, "targets");
        assert_eq!(bound.target_length, "target_length");
        assert_eq!(bound.states, ["states.1".to_string(), "onnx::Slice_3".to_string()]);
    }

    #[test]
    fn binding_ignores_input_order() {
        let bound = PredictorInputs::bind(&names(&[
            "states.1",
            "targets",
            "onnx::Slice_3",
            "target_length",
        ]))
        .unwrap();

        assert_eq!(bound.targets, "targets");
        assert_eq!(bound.states, ["states.1".to_string(), "onnx::Slice_3".to_string()]);
    }

    #[test]
    fn rejects_fused_decoder() {
        let result = PredictorInputs::bind(&names(&[
            "encoder_outputs",
            "targets",
            "input_states_1",
            "input_states_2",
        ]));

        assert!(matches!(
            result,
            Err(ModelError::UnexpectedInput { name }) if name == "encoder_outputs"
        ));
    }

    #[test]
    fn requires_target_length() {
        let result = PredictorInputs::bind(&names(&["targets", "h", "c", "extra"]));

        assert!(matches!(
            result,
            Err(ModelError::MissingInput { name }) if name == "target_length"
        ));
    }
}
