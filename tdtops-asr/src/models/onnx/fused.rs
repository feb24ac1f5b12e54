//! Fused prediction + joint graph (`decoder_joint`).
//!
//! The graph takes one encoder frame with the previous label and LSTM states,
//! and returns the joint logits together with the updated states. To drive it
//! through the separate [`Predictor`] and [`Joint`] traits, the predictor half
//! only records the step to run, and the joint half runs the graph and fills
//! in the resulting states. A committed [`FusedState::Pending`] therefore
//! resolves to whatever the joint produced for that step.

use super::{
    FUSED_ENCODER_INPUT, LstmState, LSTM_STATE_SHAPE, flat_output, input_names, output_names,
    require_input, state_inputs, state_outputs, take_array3,
};
use crate::error::ModelError;
use crate::traits::{Joint, Predictor};
use ndarray::prelude::*;
use ort::{inputs, session::Session, value::Tensor};
use std::cell::RefCell;
use std::rc::Rc;

const TARGETS: &str = "targets";
const TARGET_LENGTH: &str = "target_length";
const LOGITS: &str = "outputs";

/// One pending evaluation of the fused graph.
#[derive(Debug)]
pub struct FusedStep {
    label: usize,
    input: Rc<LstmState>,
    output: RefCell<Option<Rc<LstmState>>>,
}

impl FusedStep {
    pub fn label(&self) -> usize {
        self.label
    }

    pub fn input(&self) -> &LstmState {
        &self.input
    }

    /// Record the states the graph produced for this step.
    pub fn complete(&self, states: LstmState) {
        *self.output.borrow_mut() = Some(Rc::new(states));
    }
}

/// Predictor state for a fused graph.
#[derive(Clone, Debug)]
pub enum FusedState {
    /// Concrete LSTM states
    Ready(Rc<LstmState>),
    /// States produced by a step, available once the joint has run it
    Pending(Rc<FusedStep>),
}

impl FusedState {
    pub fn resolve(&self) -> Result<Rc<LstmState>, ModelError> {
        match self {
            FusedState::Ready(states) => Ok(Rc::clone(states)),
            FusedState::Pending(step) => {
                step.output
                    .borrow()
                    .clone()
                    .ok_or_else(|| ModelError::MissingOutput {
                        name: "fused decoder states".to_string(),
                    })
            }
        }
    }
}

/// Predictor half of a fused graph. Runs nothing itself.
#[derive(Clone, Debug)]
pub struct FusedPredictor {
    state_shape: (usize, usize, usize),
}

impl FusedPredictor {
    pub fn new() -> Self {
        Self {
            state_shape: LSTM_STATE_SHAPE,
        }
    }

    pub fn with_state_shape(mut self, shape: (usize, usize, usize)) -> Self {
        self.state_shape = shape;
        self
    }
}

impl Default for FusedPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for FusedPredictor {
    type State = FusedState;
    type Embedding = Rc<FusedStep>;

    fn initial_state(&self) -> FusedState {
        FusedState::Ready(Rc::new((
            Array3::zeros(self.state_shape),
            Array3::zeros(self.state_shape),
        )))
    }

    fn predict(
        &mut self,
        label: usize,
        state: &FusedState,
    ) -> Result<(Rc<FusedStep>, FusedState), ModelError> {
        let step = Rc::new(FusedStep {
            label,
            input: state.resolve()?,
            output: RefCell::new(None),
        });

        Ok((Rc::clone(&step), FusedState::Pending(step)))
    }
}

/// Input names of a fused graph.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FusedInputs {
    encoder: String,
    targets: String,
    /// Present in NeMo exports, absent once the graph has been patched
    target_length: Option<String>,
    states: [String; 2],
}

impl FusedInputs {
    fn bind(names: &[String]) -> Result<Self, ModelError> {
        let encoder = require_input(names, FUSED_ENCODER_INPUT)?;
        let targets = require_input(names, TARGETS)?;
        let target_length = require_input(names, TARGET_LENGTH).ok();

        let bound: Vec<&str> = [Some(FUSED_ENCODER_INPUT), Some(TARGETS), target_length.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        Ok(Self {
            encoder,
            targets,
            states: state_inputs(names, &bound)?,
            target_length,
        })
    }
}

/// Joint half of a fused graph; owns the session.
pub struct OrtFusedJoint {
    pub session: Session,
    inputs: FusedInputs,
    logits_name: String,
    state_names: [String; 2],
}

impl OrtFusedJoint {
    pub fn new(session: Session) -> Result<Self, ModelError> {
        let inputs = FusedInputs::bind(&input_names(&session))?;

        let outputs = output_names(&session);
        let state_names = state_outputs(&outputs)?;
        let logits_name = logits_output(&outputs);

        Ok(Self {
            session,
            inputs,
            logits_name,
            state_names,
        })
    }
}

/// `outputs` when present, else the first output.
fn logits_output(names: &[String]) -> String {
    names
        .iter()
        .find(|n| *n == LOGITS)
        .or_else(|| names.first())
        .cloned()
        .unwrap_or_else(|| LOGITS.to_string())
}

impl Joint<Rc<FusedStep>> for OrtFusedJoint {
    fn joint(
        &mut self,
        frame: ArrayView1<'_, f32>,
        step: &Rc<FusedStep>,
    ) -> Result<Array1<f32>, ModelError> {
        let encoder_outputs = frame
            .to_owned()
            .into_shape_with_order((1, frame.len(), 1))?;
        let (states_1, states_2) = step.input();

        let FusedInputs {
            encoder,
            targets,
            target_length,
            states: [states_1_name, states_2_name],
        } = &self.inputs;

        let mut inputs = inputs![
            encoder.as_str() => Tensor::from_array(encoder_outputs)?,
            targets.as_str() => Tensor::from_array(Array2::from_elem((1, 1), step.label() as i32))?,
            states_1_name.as_str() => Tensor::from_array(states_1.clone())?,
            states_2_name.as_str() => Tensor::from_array(states_2.clone())?,
        ];

        if let Some(name) = target_length {
            let length = Tensor::from_array(Array1::from_elem((1,), 1i32))?;
            inputs.push((name.as_str().into(), length.into()));
        }

        let mut outputs = self.session.run(inputs)?;

        let logits = flat_output(&outputs, &self.logits_name)?;

        let [state_1_name, state_2_name] = &self.state_names;
        step.complete((
            take_array3(&mut outputs, state_1_name)?,
            take_array3(&mut outputs, state_2_name)?,
        ));

        Ok(logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecodeConfig;
    use crate::decoder::TdtDecoder;
    use crate::error::{DecodeError, Error};
    use crate::models::onnx::names;
    use crate::testing::{Decision, indexed_frames, one_hot};

    const BLANK: usize = 4;

    /// Stands in for the fused graph: the new states hold `10 * frame + label`,
    /// and decisions are scripted per frame.
    struct EchoJoint<F> {
        decide: F,
        /// `(frame, label, input state value)` per run
        runs: Vec<(usize, usize, f32)>,
    }

    impl<F: FnMut(usize) -> Decision> Joint<Rc<FusedStep>> for EchoJoint<F> {
        fn joint(
            &mut self,
            frame: ArrayView1<'_, f32>,
            step: &Rc<FusedStep>,
        ) -> Result<Array1<f32>, ModelError> {
            let t = frame[0] as usize;
            self.runs.push((t, step.label(), step.input().0[[0, 0, 0]]));

            let next = Array3::from_elem((1, 1, 1), (10 * t + step.label()) as f32);
            step.complete((next.clone(), next));

            Ok(one_hot((self.decide)(t), BLANK, 5))
        }
    }

    #[test]
    fn emitted_step_commits_graph_states() {
        let mut joint = EchoJoint {
            decide: |t: usize| match t {
                0 => Decision::emit(2, 1),
                _ => Decision::blank(BLANK),
            },
            runs: Vec::new(),
        };
        let mut predictor = FusedPredictor::new().with_state_shape((1, 1, 1));
        let decoder = TdtDecoder::new(BLANK, DecodeConfig::default()).unwrap();

        let out = decoder
            .decode(&indexed_frames(3), &mut predictor, &mut joint)
            .unwrap();

        assert_eq!(out.token_ids(), vec![2]);
        // frames 1 and 2 both see the states of the emission at frame 0
        assert_eq!(joint.runs, vec![(0, BLANK, 0.0), (1, 2, 4.0), (2, 2, 4.0)]);
    }

    #[test]
    fn blank_step_keeps_previous_states() {
        let mut joint = EchoJoint {
            decide: |t: usize| match t {
                1 => Decision::emit(3, 1),
                _ => Decision::blank(BLANK),
            },
            runs: Vec::new(),
        };
        let mut predictor = FusedPredictor::new().with_state_shape((1, 1, 1));
        let decoder = TdtDecoder::new(BLANK, DecodeConfig::default()).unwrap();

        decoder
            .decode(&indexed_frames(3), &mut predictor, &mut joint)
            .unwrap();

        // states from the blank at frame 0 are dropped
        assert_eq!(joint.runs, vec![(0, BLANK, 0.0), (1, BLANK, 0.0), (2, 3, 14.0)]);
    }

    #[test]
    fn pending_state_requires_a_run() {
        let mut predictor = FusedPredictor::new().with_state_shape((1, 1, 1));
        let initial = predictor.initial_state();

        let (step, pending) = predictor.predict(7, &initial).unwrap();
        assert!(matches!(
            pending.resolve(),
            Err(ModelError::MissingOutput { .. })
        ));

        step.complete((Array3::ones((1, 1, 1)), Array3::zeros((1, 1, 1))));
        assert_eq!(pending.resolve().unwrap().0[[0, 0, 0]], 1.0);
    }

    #[test]
    fn unrun_commit_is_a_contract_violation() {
        struct Lazy;

        impl Joint<Rc<FusedStep>> for Lazy {
            fn joint(
                &mut self,
                _: ArrayView1<'_, f32>,
                _: &Rc<FusedStep>,
            ) -> Result<Array1<f32>, ModelError> {
                Ok(one_hot(Decision::emit(0, 1), BLANK, 5))
            }
        }

        let decoder = TdtDecoder::new(BLANK, DecodeConfig::default()).unwrap();
        let err = decoder
            .decode(&indexed_frames(3), &mut FusedPredictor::new(), &mut Lazy)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Decode(DecodeError::ContractViolation { step: 2, .. })
        ));
    }

    #[test]
    fn binds_nemo_fused_inputs() {
        let bound = FusedInputs::bind(&names(&[
            "encoder_outputs",
            "targets",
            "target_length",
            "input_states_1",
            "input_states_2",
        ]))
        .unwrap();

        assert_eq!(bound.encoder, "encoder_outputs");
        assert_eq!(bound.target_length.as_deref(), Some("target_length"));
        assert_eq!(
            bound.states,
            ["input_states_1".to_string(), "input_states_2".to_string()]
        );
    }

    #[test]
    fn binds_patched_fused_inputs() {
        let bound = FusedInputs::bind(&names(&[
            "encoder_outputs",
            "targets",
            "input_states_1",
            "input_states_2",
        ]))
        .unwrap();

        assert_eq!(bound.targets, "targets");
        assert_eq!(bound.target_length, None);
        assert_eq!(
            bound.states,
            ["input_states_1".to_string(), "input_states_2".to_string()]
        );
    }

    #[test]
    fn rejects_split_predictor() {
        let result = FusedInputs::bind(&names(&[
            "targets",
            "target_length",
            "states.1",
            "onnx::Slice_3",
        ]));

        assert!(matches!(
            result,
            Err(ModelError::MissingInput { name }) if name == FUSED_ENCODER_INPUT
        ));
    }

    #[test]
    fn prefers_named_logits() {
        assert_eq!(
            logits_output(&names(&["output_states_1", "outputs", "output_states_2"])),
            "outputs"
        );
        assert_eq!(
            logits_output(&names(&["joint", "h", "c"])),
            "joint"
        );
    }
}
