use thiserror::Error;
use trigger_hub_error::{ErrorExt, StatusCode};

/// Ошибки кодирования конверта сообщения.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ErrorExt for CodecError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Encode(_) => StatusCode::SerializationFailed,
            Self::Decode(_) => StatusCode::DeserializationFailed,
        }
    }
}
