//! Configuration of a tag
//!
//! The configuration file is made up of `key=value` lines. Blank lines and lines starting with `#`
//! are skipped, as is any whitespace around a key or a value.
//!
//! ```text
//! advertise_dongle_id=0
//! advertise_interval_in_units_0625_ms=160
//! advertise_rssi_value=-50
//! # optional, the identifier is all zeros when this is not given
//! advertise_uuid=00010002000300112233445566778899
//! ```

use crate::identifier::Identifier;
use crate::retry::{retry, DEFAULT_ATTEMPTS};
use core::fmt;
use core::str::FromStr;
use std::path::Path;

/// The delimiter between a key and its value
pub const DELIMITER: char = '=';

const DONGLE_ID: &str = "advertise_dongle_id";
const INTERVAL: &str = "advertise_interval_in_units_0625_ms";
const RSSI: &str = "advertise_rssi_value";
const UUID: &str = "advertise_uuid";

/// Error when reading the configuration
#[derive(Debug)]
pub enum ConfigError {
    /// A required key is not in the configuration
    MissingKey(&'static str),
    /// The value of a key could not be parsed
    InvalidValue { key: &'static str, value: String },
    /// A line does not contain the delimiter
    MissingDelimiter { line: usize },
    /// The configuration file could not be read
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingKey(key) => write!(f, "missing configuration key '{}'", key),
            ConfigError::InvalidValue { key, value } => write!(f, "invalid value '{}' for key '{}'", value, key),
            ConfigError::MissingDelimiter { line } => {
                write!(f, "line {} is not of the form key{}value", line, DELIMITER)
            }
            ConfigError::Io(e) => write!(f, "failed to read configuration file, {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// The configuration of a tag
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagConfig {
    /// The index of the controller used for advertising
    pub advertise_dongle_id: i32,
    /// The advertising interval in units of 0.625 ms
    pub advertise_interval_in_units_0625_ms: u16,
    /// The calibrated RSSI of the tag
    pub advertise_rssi_value: i8,
    /// The identifier that is advertised
    pub advertise_uuid: Identifier,
}

impl TagConfig {
    /// Read the configuration from a file
    ///
    /// Opening the file is attempted five times before giving up.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let text = retry(DEFAULT_ATTEMPTS, |_| std::fs::read_to_string(path))?;

        log::debug!("read configuration from {}", path.display());

        text.parse()
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: Option<&str>) -> Result<T, ConfigError> {
    let value = value.ok_or(ConfigError::MissingKey(key))?;

    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

impl FromStr for TagConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut dongle_id = None;
        let mut interval = None;
        let mut rssi = None;
        let mut uuid = None;

        for (number, line) in s.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once(DELIMITER)
                .ok_or(ConfigError::MissingDelimiter { line: number + 1 })?;

            let value = value.trim();

            match key.trim() {
                DONGLE_ID => dongle_id = Some(value),
                INTERVAL => interval = Some(value),
                RSSI => rssi = Some(value),
                UUID => uuid = Some(value),
                unknown => log::warn!("ignoring unknown configuration key '{}'", unknown),
            }
        }

        let advertise_uuid = match uuid {
            Some(value) => Identifier::new(value).map_err(|_| ConfigError::InvalidValue {
                key: UUID,
                value: value.to_string(),
            })?,
            None => Identifier::default(),
        };

        Ok(TagConfig {
            advertise_dongle_id: parse_value(DONGLE_ID, dongle_id)?,
            advertise_interval_in_units_0625_ms: parse_value(INTERVAL, interval)?,
            advertise_rssi_value: parse_value(RSSI, rssi)?,
            advertise_uuid,
        })
    }
}
