//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config, std::env::var("PORT").ok().as_deref());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load from `path` if given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => parse_config(""),
    }
}

/// Hosting platforms hand out the listen port through `PORT`.
fn apply_env_overrides(config: &mut RelayConfig, port: Option<&str>) {
    let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) else {
        return;
    };
    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(mut addr) => {
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
        Err(_) => {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_override() {
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, Some("8123"));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8123");

        apply_env_overrides(&mut config, Some("not-a-port"));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8123");

        apply_env_overrides(&mut config, None);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8123");
    }

    #[test]
    fn test_validation_error_message() {
        let err = ConfigError::Validation(vec![
            ValidationError {
                field: "sweeper.interval_secs",
                reason: "must be > 0".into(),
            },
            ValidationError {
                field: "status.interval_secs",
                reason: "must be > 0".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: sweeper.interval_secs: must be > 0, status.interval_secs: must be > 0"
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[status]\ninterval_secs = 15\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.status.interval_secs, 15);

        std::fs::write(&path, "[status]\ninterval_secs = 0\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
