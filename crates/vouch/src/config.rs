//! Validator settings, optionally loaded from the environment.
//!
//! # Example
//!
//! ```ignore
//! use vouch::{create_validator, Settings, ValidationFailed, ValidatorOptions};
//!
//! // VOUCH_MASK=true VOUCH_LOG_FAILURES=true
//! let settings = Settings::from_env().expect("invalid VOUCH_* settings");
//! let validator = create_validator(
//!     ValidatorOptions::new()
//!         .validation_error(ValidationFailed::from)
//!         .with_settings(&settings),
//! );
//! ```

use serde::{Deserialize, Serialize};
#[cfg(feature = "config")]
use std::fmt;

/// Prefix of the environment variables read by [`Settings::from_env`].
pub const ENV_PREFIX: &str = "VOUCH_";

/// Switches for the stock validator behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prune data to the constrained fields before evaluating it
    pub mask: bool,
    /// Log failures through `tracing`
    pub log_failures: bool,
    /// Strip offending values from reported violations
    pub redact_values: bool,
}

/// Error type for settings loading failures.
#[cfg(feature = "config")]
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    EnvyError(envy::Error),
}

#[cfg(feature = "config")]
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvyError(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

#[cfg(feature = "config")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::EnvyError(e) => Some(e),
        }
    }
}

#[cfg(feature = "config")]
impl From<envy::Error> for ConfigError {
    fn from(err: envy::Error) -> Self {
        ConfigError::EnvyError(err)
    }
}

#[cfg(feature = "config")]
impl Settings {
    /// Load `VOUCH_*` variables, after reading a `.env` file if one exists.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Settings>()?)
    }

    /// Load settings from explicit `(name, value)` pairs with the `VOUCH_` prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, Settings>(vars)?)
    }
}
