//! Command-line front end for tdtops-asr.

pub mod cli;
pub mod config;
pub mod decode;
pub mod inspect;
pub mod session;
pub mod verify;
pub mod vocab;
