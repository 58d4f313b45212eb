//! Worker configuration parsed from environment variables.

use canvas::geometry::{Chrome, DecodeCorrection};

pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl frames::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG_PARSE"
    }
}

/// Encoding used on stdin/stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Length-delimited protobuf envelopes.
    Protobuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTimeouts {
    pub load_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerConfig {
    pub timeouts: LoadTimeouts,
    pub command_queue_capacity: usize,
    pub event_queue_capacity: usize,
    pub frame_interval_ms: u64,
    pub chrome: Chrome,
    pub correction: DecodeCorrection,
    pub wire: WireFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            timeouts: LoadTimeouts { load_secs: DEFAULT_LOAD_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS },
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            chrome: Chrome::default(),
            correction: DecodeCorrection::default(),
            wire: WireFormat::default(),
        }
    }
}

impl WorkerConfig {
    /// Build typed worker config from environment variables.
    ///
    /// Optional:
    /// - `FOG_LOAD_TIMEOUT_SECS`: default 30
    /// - `FOG_CONNECT_TIMEOUT_SECS`: default 10
    /// - `FOG_COMMAND_QUEUE_CAPACITY`: default 256
    /// - `FOG_EVENT_QUEUE_CAPACITY`: default 256
    /// - `FOG_FRAME_INTERVAL_MS`: default 16
    /// - `FOG_CHROME_WIDTH` / `FOG_CHROME_HEIGHT`: default 0 / 46
    /// - `FOG_DECODE_CORRECTION`: `squared` (default) or `linear`
    /// - `FOG_WIRE_FORMAT`: `json` (default) or `protobuf`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for an unknown enum value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for an unknown enum value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let parse_u64 = |key: &str, default: u64| env_parse(&lookup, key, default);
        let parse_usize = |key: &str, default: usize| env_parse(&lookup, key, default);
        let defaults = Self::default();

        let timeouts = LoadTimeouts {
            load_secs: parse_u64("FOG_LOAD_TIMEOUT_SECS", DEFAULT_LOAD_TIMEOUT_SECS),
            connect_secs: parse_u64("FOG_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let chrome = Chrome {
            width: env_parse(&lookup, "FOG_CHROME_WIDTH", defaults.chrome.width),
            height: env_parse(&lookup, "FOG_CHROME_HEIGHT", defaults.chrome.height),
        };

        Ok(Self {
            timeouts,
            command_queue_capacity: parse_usize("FOG_COMMAND_QUEUE_CAPACITY", DEFAULT_COMMAND_QUEUE_CAPACITY).max(1),
            event_queue_capacity: parse_usize("FOG_EVENT_QUEUE_CAPACITY", DEFAULT_EVENT_QUEUE_CAPACITY).max(1),
            frame_interval_ms: parse_u64("FOG_FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS).max(1),
            chrome,
            correction: parse_correction(lookup("FOG_DECODE_CORRECTION").as_deref())?,
            wire: parse_wire_format(lookup("FOG_WIRE_FORMAT").as_deref())?,
        })
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_correction(raw: Option<&str>) -> Result<DecodeCorrection, ConfigError> {
    match raw.unwrap_or("squared") {
        "squared" => Ok(DecodeCorrection::Squared),
        "linear" => Ok(DecodeCorrection::Linear),
        other => Err(ConfigError::Parse(format!(
            "unsupported FOG_DECODE_CORRECTION '{other}' (expected 'squared' or 'linear')"
        ))),
    }
}

fn parse_wire_format(raw: Option<&str>) -> Result<WireFormat, ConfigError> {
    match raw.unwrap_or("json") {
        "json" => Ok(WireFormat::Json),
        "protobuf" => Ok(WireFormat::Protobuf),
        other => Err(ConfigError::Parse(format!("unknown FOG_WIRE_FORMAT: {other}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
