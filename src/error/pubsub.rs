use thiserror::Error;
use tokio::sync::mpsc;
use trigger_hub_error::{ErrorExt, StatusCode};

/// Ошибка при неблокирующем получении значения из потока триггера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    #[error("no values available")]
    Empty,

    #[error("trigger stream is closed")]
    Closed,
}

impl From<mpsc::error::TryRecvError> for TryRecvError {
    fn from(err: mpsc::error::TryRecvError) -> Self {
        match err {
            mpsc::error::TryRecvError::Empty => TryRecvError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryRecvError::Closed,
        }
    }
}

impl ErrorExt for TryRecvError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty => StatusCode::NotFound,
            Self::Closed => StatusCode::ConnectionClosed,
        }
    }
}
