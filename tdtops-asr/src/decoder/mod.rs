//! Greedy Token-and-Duration Transducer decoding.

mod greedy;
mod state;

pub use greedy::TdtDecoder;
pub use state::{DecodeState, Transition};
