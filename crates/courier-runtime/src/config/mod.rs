//! Configuration loading and validation for the Courier runtime.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    CourierConfig, HttpConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    ServerConfig, SpanEventConfig,
};
pub use validation::validate_config;
