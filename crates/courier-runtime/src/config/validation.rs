//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CourierConfig, HttpConfig, LogOutput, LoggingConfig, ServerConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_http_config(&config.http)?;
    validate_logging_config(&config.logging)?;
    validate_plugin_sections(config)?;
    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.trim().is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }
    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }
    Ok(())
}

fn validate_http_config(http: &HttpConfig) -> ConfigResult<()> {
    if http.user_agent.trim().is_empty() {
        return Err(ConfigError::missing_field("http.user_agent"));
    }
    if http.timeout_ms == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module name: '{module}'"
        )));
    }
    Ok(())
}

/// Plugin sections must be tables so plugin configs can deserialize from them.
fn validate_plugin_sections(config: &CourierConfig) -> ConfigResult<()> {
    for (name, section) in &config.plugins {
        if !section.is_object() {
            return Err(ConfigError::validation(format!(
                "Plugin section '{name}' must be a table"
            )));
        }
    }
    Ok(())
}
