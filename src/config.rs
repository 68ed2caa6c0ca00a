//! Configuration management for stageplan
//!
//! Settings are loaded from environment variables with fallback defaults.
//! Command-line flags take precedence over anything read here.
//!
//! # Environment Variables
//!
//! - `STAGEPLAN_LOG_LEVEL`: Logging level - default: "info"
//! - `STAGEPLAN_FORMAT`: Output format (dockerfile|json|yaml|human) - default: "dockerfile"
//! - `STAGEPLAN_STRICT`: Treat policy warnings as fatal (true|false) - default: "false"
//! - `STAGEPLAN_TEMPLATE`: Build type used when none is given or detected - default: "java"
//! - `STAGEPLAN_MAX_STAGES`: Upper bound on stages in a rendered graph - default: "64"
//!
//! # Example
//!
//! ```no_run
//! use stageplan::StageplanConfig;
//!
//! let config = StageplanConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::templates::BuildType;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FORMAT: &str = "dockerfile";
const DEFAULT_STRICT: bool = false;
const DEFAULT_TEMPLATE: &str = "java";
const DEFAULT_MAX_STAGES: usize = 64;

/// Upper limit for `max_stages`
const STAGE_LIMIT: usize = 1024;

const VALID_FORMATS: &[&str] = &["dockerfile", "json", "yaml", "human"];

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Runtime settings for the stageplan CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageplanConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Default output format for `render`
    pub format: String,

    /// Whether policy warnings fail validation
    pub strict: bool,

    /// Build type used when no template is named or detected
    pub template: String,

    /// Maximum number of stages a plan may contain
    pub max_stages: usize,
}

impl Default for StageplanConfig {
    /// Loads configuration from `STAGEPLAN_*` environment variables.
    ///
    /// Unparseable values fall back to their defaults; `validate` reports
    /// values that parse but are out of range.
    fn default() -> Self {
        let log_level = env::var("STAGEPLAN_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let format = env::var("STAGEPLAN_FORMAT")
            .unwrap_or_else(|_| DEFAULT_FORMAT.to_string())
            .to_lowercase();

        let strict = env::var("STAGEPLAN_STRICT")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_STRICT);

        let template = env::var("STAGEPLAN_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_TEMPLATE.to_string())
            .to_lowercase();

        let max_stages = env::var("STAGEPLAN_MAX_STAGES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_STAGES);

        Self {
            log_level,
            format,
            strict,
            template,
            max_stages,
        }
    }
}

impl StageplanConfig {
    /// Validates the configuration
    ///
    /// Checks that the stage limit is in range and that the log level,
    /// output format and default template are recognised.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_stages == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max stages must be at least 1".to_string(),
            ));
        }
        if self.max_stages > STAGE_LIMIT {
            return Err(ConfigError::ValidationFailed(format!(
                "Max stages cannot exceed {}",
                STAGE_LIMIT
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if !VALID_FORMATS.contains(&self.format.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid format: {}. Valid options: {}",
                self.format,
                VALID_FORMATS.join(", ")
            )));
        }

        self.build_type()?;
        Ok(())
    }

    /// The configured default build type
    pub fn build_type(&self) -> Result<BuildType, ConfigError> {
        self.template
            .parse::<BuildType>()
            .map_err(|e| ConfigError::ParseError {
                field: "STAGEPLAN_TEMPLATE".to_string(),
                error: e.to_string(),
            })
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("format".to_string(), self.format.clone());
        map.insert("strict".to_string(), self.strict.to_string());
        map.insert("template".to_string(), self.template.clone());
        map.insert("max_stages".to_string(), self.max_stages.to_string());

        map
    }
}

impl fmt::Display for StageplanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stageplan Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Format: {}", self.format)?;
        writeln!(f, "  Strict: {}", self.strict)?;
        writeln!(f, "  Template: {}", self.template)?;
        writeln!(f, "  Max Stages: {}", self.max_stages)?;
        Ok(())
    }
}
