//! Транспортный порт хаба.
//!
//! Хаб не знает, какой бэкенд стоит за транспортом: он видит только
//! [`Transport`]. Связь реестра с подписками на транспорте ведёт
//! [`TransportLink`], а [`MemoryBackend`] служит внутрипроцессной заменой
//! сетевого pub/sub сервера.

pub mod link;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
pub use trigger_hub_error::TransportError;

pub use link::TransportLink;
pub use memory::{MemoryBackend, MemoryTransport};

/// Входящий поток одной подписки на транспорте. Завершение потока означает,
/// что подписка на стороне бэкенда исчезла.
pub type InboundFeed = mpsc::Receiver<Bytes>;

/// Порт сетевого pub/sub бэкенда.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Публикует сообщение. Возвращает число получателей по данным бэкенда
    /// (значение справочное).
    async fn publish(
        &self,
        trigger: &str,
        payload: Bytes,
    ) -> Result<usize, TransportError>;

    /// Открывает подписку на триггер.
    async fn subscribe(
        &self,
        trigger: &str,
    ) -> Result<InboundFeed, TransportError>;

    /// Закрывает подписку на триггер.
    async fn unsubscribe(
        &self,
        trigger: &str,
    ) -> Result<(), TransportError>;

    /// Триггеры, у которых на бэкенде есть подписчики.
    async fn active_triggers(&self) -> Result<Vec<String>, TransportError>;
}
