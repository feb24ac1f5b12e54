//! tdtops-asr: greedy Token-and-Duration Transducer decoding.
//!
//! This crate turns encoder features into text with a TDT model, where the
//! joint network predicts both the next token and how many encoder frames to
//! skip after it.
//!
//! # Architecture
//!
//! The decode loop only sees the networks through three traits:
//!
//! - [`traits::Encoder`]: feature matrix to hidden-vector sequence
//! - [`traits::Predictor`]: previous label and recurrent state to embedding
//! - [`traits::Joint`]: encoder frame and embedding to token and duration scores
//!
//! [`decoder::TdtDecoder`] drives them, [`vocab::Vocabulary`] assembles the
//! emitted ids, and [`pipelines::TdtPipeline`] chains the stages. ONNX Runtime
//! implementations live in [`models::onnx`].
//!
//! # Quick Start
//!
//! ```ignore
//! use tdtops_asr::config::DecodeConfig;
//! use tdtops_asr::features::{TDT_MEL_BINS, read_features};
//! use tdtops_asr::pipelines::OrtTdtModel;
//! use tdtops_asr::types::ModelRepo;
//! use ort::session::Session;
//!
//! let repo = ModelRepo::Path("model_dir".into());
//! let mut pipeline = OrtTdtModel::from_repo(&repo, Session::builder()?, DecodeConfig::default())?;
//!
//! let features = read_features("features.bin", TDT_MEL_BINS)?;
//! let result = pipeline.transcribe(features.view())?;
//! println!("{}", result.text);
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod features;
pub mod models;
pub mod pipelines;
pub mod traits;
pub mod types;
pub mod verify;
pub mod vocab;

#[cfg(test)]
mod testing;
