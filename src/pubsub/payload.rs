use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Дискриминант полезной нагрузки: по нему подписчик фильтрует значения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Int,
    Float,
    Bool,
    String,
    Bytes,
    Json,
}

/// Значение, публикуемое в триггер.
///
/// Между вариантами нет приведения: `Int(1)` никогда не будет доставлен
/// подписчику на `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Payload {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    Json(serde_json::Value),
}

/// Rust-тип, на который можно подписаться.
///
/// Каждый тип привязан ровно к одному [`PayloadKind`].
pub trait HubValue: Sized + Send + 'static {
    const KIND: PayloadKind;

    fn into_payload(self) -> Payload;

    /// `None`, если вариант не совпадает с [`HubValue::KIND`].
    fn from_payload(payload: Payload) -> Option<Self>;
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Int(_) => PayloadKind::Int,
            Self::Float(_) => PayloadKind::Float,
            Self::Bool(_) => PayloadKind::Bool,
            Self::String(_) => PayloadKind::String,
            Self::Bytes(_) => PayloadKind::Bytes,
            Self::Json(_) => PayloadKind::Json,
        }
    }

    pub fn is<T: HubValue>(&self) -> bool {
        self.kind() == T::KIND
    }

    pub fn into_value<T: HubValue>(self) -> Option<T> {
        T::from_payload(self)
    }
}

macro_rules! impl_hub_value {
    ($ty:ty, $variant:ident) => {
        impl HubValue for $ty {
            const KIND: PayloadKind = PayloadKind::$variant;

            fn into_payload(self) -> Payload {
                Payload::$variant(self)
            }

            fn from_payload(payload: Payload) -> Option<Self> {
                match payload {
                    Payload::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Payload {
            fn from(v: $ty) -> Self {
                Payload::$variant(v)
            }
        }
    };
}

impl_hub_value!(i64, Int);
impl_hub_value!(f64, Float);
impl_hub_value!(bool, Bool);
impl_hub_value!(String, String);
impl_hub_value!(Bytes, Bytes);
impl_hub_value!(serde_json::Value, Json);

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::String(v.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(v))
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}
