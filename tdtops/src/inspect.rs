//! Inspect subcommand - print graph inputs and outputs.

use crate::session::load_session;
use eyre::Result;
use std::path::PathBuf;
use tdtops_asr::models::onnx::describe_session;

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to an ONNX model
    pub model: PathBuf,
}

#[derive(Debug)]
pub struct Config {
    pub model: PathBuf,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self { model: args.model })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let session = load_session(&config.model)?;

    print!("{}", describe_session(&session));

    Ok(())
}
