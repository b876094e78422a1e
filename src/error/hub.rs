use std::{error::Error as _, fmt};

use thiserror::Error;
use trigger_hub_error::{ErrorExt, LogLevel, StatusCode, TransportError};

use super::CodecError;

/// Триггер-заглушка для транспортных операций, не привязанных к одному
/// триггеру (например, запрос списка активных).
pub const ANY_TRIGGER: &str = "*";

pub type HubResult<T> = Result<T, HubError>;

/// Транспортная операция, во время которой произошла ошибка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Publish,
    Subscribe,
    Unsubscribe,
    Query,
}

/// Ошибки операций хаба.
///
/// Несовпадение типов, публикация без подписчиков и повторный `close` ошибками
/// не являются: сюда попадают только сбои транспорта и кодека.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("transport {operation} failed for trigger '{trigger}'")]
    Transport {
        trigger: String,
        operation: TransportOp,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl HubError {
    pub fn transport(
        trigger: &str,
        operation: TransportOp,
        source: TransportError,
    ) -> Self {
        Self::Transport {
            trigger: trigger.to_string(),
            operation,
            source,
        }
    }

    /// Имя триггера, если ошибка относится к транспортной операции.
    pub fn trigger(&self) -> Option<&str> {
        match self {
            Self::Transport { trigger, .. } => Some(trigger),
            _ => None,
        }
    }

    /// Пишет ошибку в журнал с уровнем, который задаёт её код статуса.
    pub(crate) fn log(
        &self,
        message: &str,
    ) {
        let trigger = self.trigger().unwrap_or(ANY_TRIGGER);
        let code = self.status_code();
        let cause = cause(self);
        match code.log_level() {
            LogLevel::Trace => tracing::trace!(trigger, %code, error = %self, %cause, "{message}"),
            LogLevel::Debug => tracing::debug!(trigger, %code, error = %self, %cause, "{message}"),
            LogLevel::Info => tracing::info!(trigger, %code, error = %self, %cause, "{message}"),
            LogLevel::Warn => tracing::warn!(trigger, %code, error = %self, %cause, "{message}"),
            LogLevel::Error => tracing::error!(trigger, %code, error = %self, %cause, "{message}"),
        }
    }
}

/// Текст первопричины ошибки или пустая строка.
fn cause(err: &HubError) -> String {
    err.source().map(ToString::to_string).unwrap_or_default()
}

impl fmt::Display for TransportOp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Publish => "publish",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Query => "query",
        };
        f.write_str(s)
    }
}

impl ErrorExt for HubError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport { source, .. } => source.status_code(),
            Self::Codec(e) => e.status_code(),
        }
    }
}
