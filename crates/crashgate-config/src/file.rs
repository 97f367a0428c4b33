use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The static services configuration document, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub services: Vec<ConfigFileService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFileService {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub auth_keys: Vec<ConfigFileAuthKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFileAuthKey {
    pub key: String,
    #[serde(default)]
    pub disabled: bool,
    /// Unix timestamp in seconds; 0 means the key never expires.
    #[serde(default)]
    pub expired_at: i64,
}

/// Load and parse the services config file.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
services:
  - id: "1"
    name: "foo bar service"
    auth_keys:
      - key: "key"
      - key: "expiredKey"
        expired_at: 1183161600
      - key: "disabledKey"
        disabled: true
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write temp file");
        file
    }

    #[test]
    fn loads_services_with_defaults() {
        let file = write_config(SAMPLE);
        let config = load_config_file(file.path()).expect("Failed to load config");

        assert_eq!(config.services.len(), 1);
        let service = &config.services[0];
        assert_eq!(service.id, "1");
        assert_eq!(service.name, "foo bar service");
        assert_eq!(service.auth_keys.len(), 3);

        // Defaults: not disabled, never expires
        assert!(!service.auth_keys[0].disabled);
        assert_eq!(service.auth_keys[0].expired_at, 0);

        assert_eq!(service.auth_keys[1].expired_at, 1183161600);
        assert!(service.auth_keys[2].disabled);
    }

    #[test]
    fn empty_document_yields_no_services() {
        let file = write_config("services: []\n");
        let config = load_config_file(file.path()).expect("Failed to load config");

        assert!(config.services.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config_file("/nonexistent/config.yml").unwrap_err();

        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let file = write_config("services: [oops");
        let err = load_config_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
