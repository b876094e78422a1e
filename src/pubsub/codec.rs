use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Payload;
use crate::error::CodecError;

/// Конверт сообщения на транспорте.
///
/// `origin` — идентификатор хаба-отправителя, по нему хаб узнаёт и
/// пропускает собственные сообщения, вернувшиеся из транспорта.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Uuid>,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(
        origin: Option<Uuid>,
        payload: Payload,
    ) -> Self {
        Self { origin, payload }
    }
}

pub fn encode(envelope: &Envelope) -> Result<Bytes, CodecError> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(CodecError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

/// Разбор входящего сообщения.
///
/// Байты, не являющиеся конвертом (например, опубликованные другим
/// клиентом прямо в бэкенд), возвращаются как `Payload::Bytes` без
/// отправителя; второй элемент кортежа в этом случае `true`.
pub fn decode_inbound(bytes: Bytes) -> (Envelope, bool) {
    match decode(&bytes) {
        Ok(envelope) => (envelope, false),
        Err(_) => (Envelope::new(None, Payload::Bytes(bytes)), true),
    }
}
