//! Vocab subcommand - locate and load a vocabulary.

use eyre::{Result, WrapErr};
use std::path::PathBuf;
use tdtops_asr::vocab::{EXPECTED_VOCAB_SIZE, Vocabulary, find_vocab};

#[derive(clap::Args, Debug)]
pub struct Args {
    /// Directory to search
    pub dir: PathBuf,

    /// Vocabulary size the model expects
    #[arg(long, default_value_t = EXPECTED_VOCAB_SIZE)]
    pub expected_size: usize,
}

#[derive(Debug)]
pub struct Config {
    pub dir: PathBuf,
    pub expected_size: usize,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        eyre::ensure!(
            args.dir.is_dir(),
            "not a directory: {:?}",
            args.dir.display()
        );

        Ok(Self {
            dir: args.dir,
            expected_size: args.expected_size,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let path = find_vocab(&config.dir)?;
    let vocabulary = Vocabulary::from_file(&path)
        .wrap_err_with(|| format!("failed to load vocabulary: {:?}", path.display()))?;

    if let Some(warning) = size_warning(&vocabulary, config.expected_size) {
        eprintln!("{warning}");
    }

    println!("{}", path.display());
    println!("size: {} (blank id {})", vocabulary.len(), vocabulary.blank_id());

    Ok(())
}

/// Warning line for a vocabulary whose size is not the expected one.
fn size_warning(vocabulary: &Vocabulary, expected: usize) -> Option<String> {
    (!vocabulary.check_size(expected)).then(|| {
        format!(
            "warning: vocabulary has {} pieces, expected {expected}",
            vocabulary.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        ["<unk>", "▁the", "s"].into_iter().collect()
    }

    #[test]
    fn size_mismatch_is_reported() {
        assert_eq!(
            size_warning(&vocabulary(), EXPECTED_VOCAB_SIZE).as_deref(),
            Some("warning: vocabulary has 3 pieces, expected 1024")
        );
    }

    #[test]
    fn matching_size_is_silent() {
        assert_eq!(size_warning(&vocabulary(), 3), None);
    }
}
