use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    /// An environment override that does not parse
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidOverride {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}
