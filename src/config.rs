use std::time::Duration;
use thiserror::Error;

use crate::state::DEFAULT_FADE_DELAY;

pub const FADE_DELAY_VAR: &str = "OVERLAY_FADE_DELAY_MS";
pub const PRODUCER_VAR: &str = "OVERLAY_PRODUCER";
pub const TITLE_PREFIX_VAR: &str = "OVERLAY_TITLE_PREFIX";
pub const PLACEHOLDER_ART_VAR: &str = "OVERLAY_PLACEHOLDER_ART";

const DEFAULT_TITLE_PREFIX: &str = "Now Playing";
const DEFAULT_PLACEHOLDER_ART: &str = "res/placeholder.png";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidDelay { var: &'static str, value: String },
    #[error("{var} is set but contains no command")]
    EmptyProducer { var: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub fade_delay: Duration,
    /// Producer program and arguments; `None` reads the feed from stdin
    pub producer: Option<Vec<String>>,
    pub title_prefix: String,
    pub placeholder_art: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fade_delay: DEFAULT_FADE_DELAY,
            producer: None,
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            placeholder_art: DEFAULT_PLACEHOLDER_ART.to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup(FADE_DELAY_VAR) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDelay {
                    var: FADE_DELAY_VAR,
                    value: value.clone(),
                })?;
            config.fade_delay = Duration::from_millis(millis);
        }

        // Split on whitespace only; wrap anything needing quotes in a script
        if let Some(value) = lookup(PRODUCER_VAR) {
            let parts: Vec<String> = value.split_whitespace().map(str::to_string).collect();
            if parts.is_empty() {
                return Err(ConfigError::EmptyProducer { var: PRODUCER_VAR });
            }
            config.producer = Some(parts);
        }

        if let Some(value) = lookup(TITLE_PREFIX_VAR) {
            config.title_prefix = value;
        }

        if let Some(value) = lookup(PLACEHOLDER_ART_VAR) {
            config.placeholder_art = value;
        }

        Ok(config)
    }
}
