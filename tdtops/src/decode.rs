//! Decode subcommand - features to transcript.

use crate::cli::ModelArgs;
use crate::config::ModelConfig;
use crate::session::session_builder;
use color_eyre::Section;
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::time::Instant;
use tdtops_asr::config::DecodeConfig;
use tdtops_asr::features::{TDT_MEL_BINS, read_features};
use tdtops_asr::pipelines::OrtTdtModel;

/// CLI arguments for decoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Raw little-endian f32 features, laid out [mel_bins, frames]
    pub features: PathBuf,

    /// Mel bins per frame
    #[arg(long, default_value_t = TDT_MEL_BINS)]
    pub mel_bins: usize,

    #[command(flatten)]
    pub model_args: ModelArgs,

    #[command(flatten)]
    pub decode_config: DecodeConfig,
}

/// Resolved configuration for decoding.
#[derive(Debug)]
pub struct Config {
    pub features: PathBuf,
    pub mel_bins: usize,
    pub model_config: ModelConfig,
    pub decode_config: DecodeConfig,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        args.decode_config.validate()?;

        Ok(Self {
            features: args.features,
            mel_bins: args.mel_bins,
            model_config: args.model_args.try_into()?,
            decode_config: args.decode_config,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let features = read_features(&config.features, config.mel_bins)
        .wrap_err_with(|| format!("failed to read features: {:?}", config.features.display()))
        .suggestion("features must be raw f32 values, one mel bin after another")?;

    let s = Instant::now();

    let mut pipeline = OrtTdtModel::from_repo(
        &config.model_config.repo,
        session_builder()?,
        config.decode_config,
    )?;

    tracing::info!(duration = %format_secs(s.elapsed().as_secs_f32()), "model loaded");

    let s = Instant::now();

    let result = pipeline
        .transcribe(features.view())
        .wrap_err("decoding failed")?;

    tracing::info!(duration = %format_secs(s.elapsed().as_secs_f32()), "decoding completed");

    if result.truncated {
        eprintln!("warning: step limit reached, transcript is partial");
    }

    for segment in &result.segments {
        tracing::debug!(
            text = %segment.text,
            start = segment.start,
            end = segment.end,
            "token"
        );
    }

    println!("{}", result.text);

    Ok(())
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}
