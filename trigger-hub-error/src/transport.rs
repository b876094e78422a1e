use crate::{ErrorExt, StatusCode};

/// Ошибки транспортного порта (сетевого pub/sub бэкенда).
///
/// Хаб никогда не повторяет операции сам: ошибка возвращается вызывающему
/// коду, а [`StatusCode::is_retryable`] подсказывает, имеет ли смысл повтор.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Ошибка публикации сообщения
    Publish { trigger: String, reason: String },
    /// Ошибка открытия подписки
    Subscribe { trigger: String, reason: String },
    /// Ошибка закрытия подписки
    Unsubscribe { trigger: String, reason: String },
    /// Ошибка служебного запроса (например, списка активных триггеров)
    Query { reason: String },
    /// Соединение закрыто
    Closed,
}

impl TransportError {
    /// Имя триггера, к которому относится ошибка, если есть.
    pub fn trigger(&self) -> Option<&str> {
        match self {
            Self::Publish { trigger, .. }
            | Self::Subscribe { trigger, .. }
            | Self::Unsubscribe { trigger, .. } => Some(trigger),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Publish { trigger, reason } => {
                write!(f, "Failed to publish to trigger '{trigger}': {reason}")
            }
            Self::Subscribe { trigger, reason } => {
                write!(f, "Failed to subscribe to trigger '{trigger}': {reason}")
            }
            Self::Unsubscribe { trigger, reason } => {
                write!(f, "Failed to unsubscribe from trigger '{trigger}': {reason}")
            }
            Self::Query { reason } => write!(f, "Transport query failed: {reason}"),
            Self::Closed => write!(f, "Transport connection is closed"),
        }
    }
}

impl std::error::Error for TransportError {}

impl ErrorExt for TransportError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Publish { .. } => StatusCode::PublishFailed,
            Self::Subscribe { .. } => StatusCode::SubscribeFailed,
            Self::Unsubscribe { .. } => StatusCode::UnsubscribeFailed,
            Self::Query { .. } => StatusCode::ProtocolError,
            Self::Closed => StatusCode::ConnectionClosed,
        }
    }
}
