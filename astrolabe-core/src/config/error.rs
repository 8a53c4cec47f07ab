use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating agent configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Io { path, .. } => format!(
                "Could not read the agent configuration at {}.",
                path.display()
            ),
            ConfigError::Parse { path, .. } => format!(
                "The agent configuration at {} is not valid TOML.",
                path.display()
            ),
            ConfigError::Invalid { field, reason } => {
                format!("Configuration field '{field}' is invalid: {reason}.")
            }
        }
    }
}
