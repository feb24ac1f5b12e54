//! Model backends implementing the network traits.

pub mod onnx;
