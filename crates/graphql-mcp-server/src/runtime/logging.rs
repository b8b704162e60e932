//! Logging config structures for the main binary.

use serde::Deserialize;
use tracing::Level;

/// Logging related options
#[derive(Debug, Deserialize)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(
        default = "defaults::log_level",
        deserialize_with = "parsers::from_str"
    )]
    pub level: Level,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use tracing::Level;

    pub(super) fn log_level() -> Level {
        Level::INFO
    }
}

mod parsers {
    use serde::{Deserialize, Deserializer};
    use std::str::FromStr;
    use tracing::Level;

    pub(super) fn from_str<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        Level::from_str(&level).map_err(serde::de::Error::custom)
    }
}
