//! Run configuration.
//!
//! Everything the pipeline needs from its environment is collected here once,
//! in `main`, and passed down explicitly.

use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use clap::ValueEnum;
use thiserror::Error;

use crate::localize::DEFAULT_LOCALE;

/// Environment variable holding the Open Data API key.
pub const ENV_API_KEY: &str = "TFNSW_OPENDATA_API_KEY";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Australia::Sydney;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is missing")]
    MissingApiKey(&'static str),
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// Transport modes published by the alerts API. The value is the path segment
/// used in the request URL and the name of the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
#[value(rename_all = "lower")]
pub enum TransportMode {
    Buses,
    Ferries,
    Lightrail,
    Metro,
    Nswtrains,
    Regionbuses,
    Sydneytrains,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Buses => "buses",
            TransportMode::Ferries => "ferries",
            TransportMode::Lightrail => "lightrail",
            TransportMode::Metro => "metro",
            TransportMode::Nswtrains => "nswtrains",
            TransportMode::Regionbuses => "regionbuses",
            TransportMode::Sydneytrains => "sydneytrains",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognised run options.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub target_timezone: Tz,
    pub target_locale: String,
    pub transport_mode: TransportMode,
}

impl Config {
    pub fn new(transport_mode: TransportMode) -> Self {
        Self {
            api_key: None,
            target_timezone: DEFAULT_TIMEZONE,
            target_locale: DEFAULT_LOCALE.to_string(),
            transport_mode,
        }
    }

    /// Reads the API key from [`ENV_API_KEY`]. An empty value counts as unset.
    pub fn with_api_key_from_env(mut self) -> Self {
        self.api_key = std::env::var(ENV_API_KEY).ok().filter(|k| !k.is_empty());
        self
    }

    pub fn with_timezone(mut self, name: &str) -> Result<Self, ConfigError> {
        self.target_timezone =
            Tz::from_str(name).map_err(|_| ConfigError::UnknownTimezone(name.to_string()))?;
        Ok(self)
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.target_locale = locale.into();
        self
    }

    /// The API key, required before any network call.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey(ENV_API_KEY))
    }
}
