//! Logging setup
//!
//! Every log line goes to stderr; stdout carries only the rendered plan so it
//! can be piped into an image builder. `RUST_LOG`, when set, replaces the
//! level chosen here.
//!
//! ```no_run
//! use stageplan::util::logging;
//!
//! // STAGEPLAN_LOG_LEVEL=debug STAGEPLAN_LOG_JSON=true
//! logging::init_from_env();
//! tracing::debug!(stages = 2, "Rendering plan");
//! ```

use std::env;
use std::io;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVEL_VAR: &str = "STAGEPLAN_LOG_LEVEL";
const JSON_VAR: &str = "STAGEPLAN_LOG_JSON";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    /// One JSON object per line, for CI log collectors
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Prefix each line with the emitting module, e.g. `stageplan::plan::render`
    pub include_target: bool,
    /// Source file, line and thread id
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            format: LogFormat::Plain,
            include_target: true,
            include_location: false,
        }
    }

    /// Switch to JSON lines carrying full source metadata.
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self.include_location = true;
        self
    }
}

/// `trace`, `debug`, `info`, `warn` or `error`, in any case.
pub fn parse_level(value: &str) -> Option<Level> {
    Level::from_str(value.trim()).ok()
}

fn build_filter(level: Level) -> EnvFilter {
    match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(format!("stageplan={}", level)),
    }
}

/// Install the global subscriber. Returns `false` when one is already
/// installed, in which case `config` is ignored.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let (json, plain) = match config.format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(config.include_target)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location)
                    .with_thread_ids(config.include_location),
            ),
            None,
        ),
        LogFormat::Plain => (
            None,
            Some(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(config.include_target)
                    .with_file(config.include_location)
                    .with_line_number(config.include_location),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(build_filter(config.level))
        .with(json)
        .with(plain)
        .try_init()
        .is_ok()
}

/// Logging settings from `STAGEPLAN_LOG_LEVEL` and `STAGEPLAN_LOG_JSON`.
///
/// An unreadable level falls back to `info`.
pub fn config_from_env() -> LoggingConfig {
    let level = env::var(LEVEL_VAR)
        .ok()
        .and_then(|value| parse_level(&value))
        .unwrap_or(Level::INFO);
    let json = env::var(JSON_VAR)
        .ok()
        .and_then(|value| value.parse::<bool>().ok())
        .unwrap_or(false);

    let config = LoggingConfig::new(level);
    if json {
        config.json()
    } else {
        config
    }
}

pub fn init_from_env() -> bool {
    init_logging(&config_from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level("loud"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn test_json_turns_on_location() {
        let config = LoggingConfig::new(Level::WARN).json();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_location);

        let plain = LoggingConfig::default();
        assert_eq!(plain.format, LogFormat::Plain);
        assert!(!plain.include_location);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var(LEVEL_VAR, "debug");
        env::set_var(JSON_VAR, "true");
        let config = config_from_env();
        env::remove_var(LEVEL_VAR);
        env::remove_var(JSON_VAR);

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_config_from_env_falls_back() {
        env::set_var(LEVEL_VAR, "chatty");
        env::remove_var(JSON_VAR);
        let config = config_from_env();
        env::remove_var(LEVEL_VAR);

        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.format, LogFormat::Plain);
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig::new(Level::ERROR);
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
