//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;

/// Default model repository on the Hugging Face Hub.
pub const DEFAULT_MODEL: &str = "csukuangfj/sherpa-onnx-nemo-parakeet-tdt-0.6b-v2-int8";

#[derive(Debug, Parser)]
#[command(name = "tdt")]
#[command(about = "Greedy TDT decoding and model checks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a raw feature dump to text
    Decode(crate::decode::Args),

    /// Locate and load a vocabulary file
    Vocab(crate::vocab::Args),

    /// Print the inputs and outputs of an ONNX graph
    Inspect(crate::inspect::Args),

    /// Run an encoder on random features and check its lengths
    Verify(crate::verify::Args),
}

/// Where to look for model files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelSource {
    /// Local directory if it exists, otherwise the Hugging Face API
    #[default]
    Auto,
    /// Local directory
    Path,
    /// Hugging Face cache only
    Cache,
    /// Hugging Face API (downloads missing files)
    Api,
}

#[derive(clap::Args, Debug)]
pub struct ModelArgs {
    /// Model directory or Hugging Face repository id
    #[arg(short, long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, value_enum, default_value_t)]
    pub model_source: ModelSource,
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Decode(args) => crate::decode::execute(args.try_into()?),
        Commands::Vocab(args) => crate::vocab::execute(args.try_into()?),
        Commands::Inspect(args) => crate::inspect::execute(args.try_into()?),
        Commands::Verify(args) => crate::verify::execute(args.try_into()?),
    }
}
