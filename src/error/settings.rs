use std::{io, path::PathBuf};

use thiserror::Error;
use trigger_hub_error::{ErrorExt, StatusCode};

/// Ошибки загрузки и проверки настроек хаба.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// Ошибки конфигурации и инициализации логирования.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}' (expected trace|debug|info|warn|error)")]
    InvalidLevel(String),

    #[error("invalid log filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("log directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}

impl SettingsError {
    pub fn invalid(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl ErrorExt for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(_) | Self::Invalid { .. } => StatusCode::InvalidConfig,
            Self::Logging(e) => e.status_code(),
        }
    }
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLevel(_) | Self::InvalidDirective { .. } => StatusCode::InvalidConfig,
            Self::Io { .. } => StatusCode::Io,
            Self::Init(_) => StatusCode::Internal,
        }
    }
}
