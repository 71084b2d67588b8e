//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::Settings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {0} is empty")]
    Empty(PathBuf),

    #[error("error decoding settings file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("error validating settings file: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a YAML file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    tracing::debug!(path = %path.display(), "Reading settings file");

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    tracing::debug!(bytes = content.len(), "Decoding settings");

    let settings = parse_settings(&content)?;

    for listener in &settings.listeners {
        if !listener.tls && listener.certificate.is_some() {
            tracing::warn!(
                listener = %listener.name,
                "certdetails present but enabletls is false, certificate ignored"
            );
        }
    }

    tracing::debug!(listeners = settings.listeners.len(), "Settings valid");
    Ok(settings)
}

/// Decode and validate settings from a YAML string.
pub fn parse_settings(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_yaml::from_str(content)?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}
