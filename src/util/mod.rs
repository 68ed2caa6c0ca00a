//! Utility modules for stageplan

pub mod logging;

pub use logging::{init_from_env, init_logging, LogFormat, LoggingConfig};
