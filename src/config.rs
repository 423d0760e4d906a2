use myco_core::Polarity;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::controller::MAX_BACKLIGHT;

/// Upper bound on the encoded size of [`Config`]
pub const CONFIG_MAX_SIZE: usize = 16;

/// Runtime settings, persisted as postcard bytes
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Output polarity of the IR receiver module
    pub remote_polarity: Polarity,
    /// Seconds between scheduled climate readings
    pub acquisition_interval_secs: u16,
    /// Backlight level applied at startup, 0..=15
    pub backlight_level: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_polarity: Polarity::Inverted,
            acquisition_interval_secs: 1,
            backlight_level: 7,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to encode config: {0}")]
    Encode(postcard::Error),
    #[error("Failed to decode config: {0}")]
    Decode(postcard::Error),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

impl Config {
    /// Decodes and validates stored settings
    pub fn load(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    /// Encodes into `buf`, returning the used prefix
    pub fn store<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        self.validate()?;
        postcard::to_slice(self, buf).map_err(ConfigError::Encode)
    }

    /// Stored settings, or the defaults if there are none or they are unusable
    pub fn load_or_default(bytes: &[u8]) -> Self {
        Self::load(bytes).unwrap_or_else(|err| {
            log::warn!("config: {}, using defaults", err);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.acquisition_interval_secs == 0 {
            return Err(ConfigError::Invalid("acquisition interval must be at least 1 s"));
        }
        if self.backlight_level > MAX_BACKLIGHT {
            return Err(ConfigError::Invalid("backlight level above 15"));
        }
        Ok(())
    }
}
