//! ONNX Runtime adapters for the encoder, predictor and joint networks.
//!
//! Two decoder layouts are supported: separate prediction and joint graphs
//! ([`OrtPredictor`] + [`OrtJoint`]), and a single fused graph that takes the
//! encoder frame alongside the label ([`FusedPredictor`] + [`OrtFusedJoint`]).

mod encoder;
mod fused;
mod joint;
mod predictor;

pub use encoder::OrtEncoder;
pub use fused::{FusedPredictor, FusedState, FusedStep, OrtFusedJoint};
pub use joint::OrtJoint;
pub use predictor::{LSTM_STATE_SHAPE, OrtPredictor};

use crate::error::ModelError;
use ndarray::{Array1, Array3, Ix3};
use ort::session::{Session, SessionOutputs};
use std::fmt;

/// Input that only fused decoder graphs take.
pub const FUSED_ENCODER_INPUT: &str = "encoder_outputs";

/// The two LSTM state tensors of the prediction network.
pub type LstmState = (Array3<f32>, Array3<f32>);

/// Name and type of one session input or output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub ty: String,
}

/// Model metadata and the inputs and outputs a session was exported with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionDescription {
    pub graph_name: Option<String>,
    pub producer: Option<String>,
    pub domain: Option<String>,
    pub version: Option<i64>,
    pub description: Option<String>,
    /// Custom metadata properties, sorted by key
    pub properties: Vec<(String, String)>,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

/// Describe a loaded session.
///
/// Metadata fields the model does not carry are left empty. The opset
/// imports are not exposed by ONNX Runtime and are not reported.
pub fn describe_session(session: &Session) -> SessionDescription {
    let inputs = session
        .inputs
        .iter()
        .map(|input| TensorInfo {
            name: input.name.clone(),
            ty: format!("{:?}", input.input_type),
        })
        .collect();

    let outputs = session
        .outputs
        .iter()
        .map(|output| TensorInfo {
            name: output.name.clone(),
            ty: format!("{:?}", output.output_type),
        })
        .collect();

    let mut description = SessionDescription {
        inputs,
        outputs,
        ..SessionDescription::default()
    };

    match session.metadata() {
        Ok(metadata) => {
            description.graph_name = non_empty(metadata.name().ok());
            description.producer = non_empty(metadata.producer().ok());
            description.domain = non_empty(metadata.domain().ok());
            description.version = metadata.version().ok();
            description.description = non_empty(metadata.description().ok());

            let mut properties: Vec<(String, String)> = metadata
                .custom_keys()
                .unwrap_or_default()
                .into_iter()
                .filter_map(|key| {
                    let value = metadata.custom(&key).ok().flatten()?;
                    Some((key, value))
                })
                .collect();
            properties.sort();
            description.properties = properties;
        }
        Err(e) => tracing::warn!(error = %e, "model metadata unavailable"),
    }

    description
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("graph", &self.graph_name),
            ("producer", &self.producer),
            ("domain", &self.domain),
            ("description", &self.description),
        ];

        for (label, value) in fields {
            if let Some(value) = value {
                writeln!(f, "{label}: {value}")?;
            }
        }

        if let Some(version) = self.version {
            writeln!(f, "version: {version}")?;
        }

        for (key, value) in &self.properties {
            writeln!(f, "meta: {key} = {value}")?;
        }

        writeln!(f, "inputs:")?;
        for info in &self.inputs {
            writeln!(f, "  {}: {}", info.name, info.ty)?;
        }

        writeln!(f, "outputs:")?;
        for info in &self.outputs {
            writeln!(f, "  {}: {}", info.name, info.ty)?;
        }

        Ok(())
    }
}

fn input_names(session: &Session) -> Vec<String> {
    session.inputs.iter().map(|i| i.name.clone()).collect()
}

fn output_names(session: &Session) -> Vec<String> {
    session.outputs.iter().map(|o| o.name.clone()).collect()
}

fn require_input(names: &[String], name: &str) -> Result<String, ModelError> {
    names
        .iter()
        .find(|n| *n == name)
        .cloned()
        .ok_or_else(|| ModelError::MissingInput {
            name: name.to_string(),
        })
}

/// Inputs of `names` other than `bound`, which must be exactly the two states.
fn state_inputs(names: &[String], bound: &[&str]) -> Result<[String; 2], ModelError> {
    let rest: Vec<String> = names
        .iter()
        .filter(|n| !bound.contains(&n.as_str()))
        .cloned()
        .collect();

    rest.try_into().map_err(|_| ModelError::InputCount {
        expected: bound.len() + 2,
        got: names.len(),
    })
}

/// Last two outputs, where both decoder layouts put the updated states.
fn state_outputs(names: &[String]) -> Result<[String; 2], ModelError> {
    match names {
        [_, .., state_1, state_2] => Ok([state_1.clone(), state_2.clone()]),
        _ => Err(ModelError::MissingOutput {
            name: "predictor states".to_string(),
        }),
    }
}

fn take_array3(outputs: &mut SessionOutputs<'_>, name: &str) -> Result<Array3<f32>, ModelError> {
    let value = outputs
        .remove(name)
        .ok_or_else(|| ModelError::MissingOutput {
            name: name.to_string(),
        })?;

    Ok(value
        .try_extract_array::<f32>()?
        .to_owned()
        .into_dimensionality::<Ix3>()?)
}

fn flat_output(outputs: &SessionOutputs<'_>, name: &str) -> Result<Array1<f32>, ModelError> {
    let value = outputs
        .get(name)
        .ok_or_else(|| ModelError::MissingOutput {
            name: name.to_string(),
        })?;

    Ok(value.try_extract_array::<f32>()?.iter().copied().collect())
}

#[cfg(test)]
fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
