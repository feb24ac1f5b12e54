//! Decoder configuration.

use crate::error::ConfigError;

/// Default step cap as a multiple of the encoded length
const DEFAULT_MAX_STEP_MULTIPLIER: usize = 10;

/// Default frame advance per duration class
const DEFAULT_DURATIONS: [usize; 5] = [0, 1, 2, 3, 4];

/// Configuration for greedy TDT decoding.
///
/// The blank id is not part of the configuration: it is always the
/// vocabulary size of the loaded model.
#[derive(clap::Args, Clone, Debug, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Upper bound on decode steps, as a multiple of encoded frames
    #[arg(long, default_value_t = DEFAULT_MAX_STEP_MULTIPLIER)]
    pub max_step_multiplier: usize,

    /// Frames advanced for each duration class, in model order
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DURATIONS)]
    pub durations: Vec<usize>,

    /// Stay on the current frame when the predicted duration is zero
    #[arg(long)]
    pub allow_zero_duration: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_step_multiplier: DEFAULT_MAX_STEP_MULTIPLIER,
            durations: DEFAULT_DURATIONS.to_vec(),
            allow_zero_duration: false,
        }
    }
}

impl DecodeConfig {
    /// Create a configuration with the default step cap.
    pub fn new(durations: Vec<usize>) -> Self {
        Self {
            durations,
            ..Self::default()
        }
    }

    pub fn with_max_step_multiplier(mut self, multiplier: usize) -> Self {
        self.max_step_multiplier = multiplier;
        self
    }

    pub fn with_zero_duration(mut self, allow: bool) -> Self {
        self.allow_zero_duration = allow;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_step_multiplier == 0 {
            return Err(ConfigError::InvalidStepMultiplier(self.max_step_multiplier));
        }

        if self.durations.is_empty() {
            return Err(ConfigError::EmptyDurations);
        }

        Ok(())
    }

    /// Step cap for an utterance of `length` encoded frames.
    pub fn step_limit(&self, length: usize) -> usize {
        length.saturating_mul(self.max_step_multiplier)
    }

    /// Frames to advance after emitting a token with `duration`.
    pub fn advance(&self, duration: usize) -> usize {
        if self.allow_zero_duration {
            duration
        } else {
            duration.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DecodeConfig::default();

        assert_eq!(config.durations, vec![0, 1, 2, 3, 4]);
        assert_eq!(config.max_step_multiplier, 10);
        assert!(!config.allow_zero_duration);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_multiplier() {
        let config = DecodeConfig::default().with_max_step_multiplier(0);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStepMultiplier(0))
        ));
    }

    #[test]
    fn rejects_empty_durations() {
        let config = DecodeConfig::new(vec![]);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyDurations)
        ));
    }

    #[test]
    fn zero_duration_is_floored_by_default() {
        let config = DecodeConfig::default();

        assert_eq!(config.advance(0), 1);
        assert_eq!(config.advance(3), 3);
        assert_eq!(config.with_zero_duration(true).advance(0), 0);
    }

    #[test]
    fn step_limit_scales_with_length() {
        let config = DecodeConfig::default().with_max_step_multiplier(3);

        assert_eq!(config.step_limit(7), 21);
        assert_eq!(config.step_limit(0), 0);
    }
}
