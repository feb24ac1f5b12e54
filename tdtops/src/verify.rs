//! Verify subcommand - encoder length check on random features.

use crate::session::load_session;
use color_eyre::Section;
use eyre::Result;
use std::path::PathBuf;
use tdtops_asr::features::{SubsamplingConfig, TDT_MEL_BINS};
use tdtops_asr::models::onnx::OrtEncoder;
use tdtops_asr::verify::{VERIFY_FRAME_COUNTS, verify_encoder};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to the encoder ONNX model
    pub model: PathBuf,

    /// Mel bins per frame
    #[arg(long, default_value_t = TDT_MEL_BINS)]
    pub mel_bins: usize,

    /// Seed for the random features
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

#[derive(Debug)]
pub struct Config {
    pub model: PathBuf,
    pub mel_bins: usize,
    pub seed: u64,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        eyre::ensure!(args.mel_bins > 0, "mel bins must be positive");

        Ok(Self {
            model: args.model,
            mel_bins: args.mel_bins,
            seed: args.seed,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let mut encoder = OrtEncoder::new(load_session(&config.model)?);

    let reports = verify_encoder(
        &mut encoder,
        config.mel_bins,
        &VERIFY_FRAME_COUNTS,
        SubsamplingConfig::FASTCONFORMER,
        config.seed,
    );

    for report in &reports {
        println!("{report}");
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        return Err(eyre::eyre!("{failed} of {} cases failed", reports.len()))
            .suggestion("run with RUST_LOG=tdtops_asr=debug for per-case details");
    }

    Ok(())
}
