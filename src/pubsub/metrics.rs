use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Счётчики хаба.
#[derive(Debug, Default)]
pub struct HubMetrics {
    published: AtomicU64,
    delivered: AtomicU64,
    filtered: AtomicU64,
    dropped: AtomicU64,
    inbound: AtomicU64,
    echo_suppressed: AtomicU64,
    decode_errors: AtomicU64,
    closed_endpoints: AtomicU64,
}

/// Снимок счётчиков и состояния реестра.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubStats {
    /// Вызовы локальной рассылки (публикации и входящие сообщения)
    pub published: u64,
    pub delivered: u64,
    /// Пропущено из-за несовпадения типа
    pub filtered: u64,
    /// Отброшено из-за переполнения очереди
    pub dropped: u64,
    /// Сообщения, пришедшие из транспорта
    pub inbound: u64,
    /// Собственные сообщения, вернувшиеся из транспорта
    pub echo_suppressed: u64,
    pub decode_errors: u64,
    /// Подписчики, завершённые через `close`
    pub closed_endpoints: u64,
    pub active_triggers: usize,
    pub endpoints: usize,
}

/// Итог локальной рассылки одного значения.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOut {
    pub delivered: usize,
    pub filtered: usize,
    pub dropped: usize,
}

/// Итог `Hub::publish`: локальная часть плюс ответ транспорта.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReport {
    pub delivered: usize,
    pub filtered: usize,
    pub dropped: usize,
    /// Число получателей по данным транспорта; `None` без транспорта
    pub remote_receivers: Option<usize>,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fan_out(
        &self,
        fan_out: &FanOut,
    ) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(fan_out.delivered as u64, Ordering::Relaxed);
        self.filtered
            .fetch_add(fan_out.filtered as u64, Ordering::Relaxed);
        self.dropped
            .fetch_add(fan_out.dropped as u64, Ordering::Relaxed);
    }

    pub fn record_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_echo(&self) {
        self.echo_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(
        &self,
        count: usize,
    ) {
        self.closed_endpoints
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Снимок счётчиков; поля реестра заполняет хаб.
    pub fn snapshot(
        &self,
        active_triggers: usize,
        endpoints: usize,
    ) -> HubStats {
        HubStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            inbound: self.inbound.load(Ordering::Relaxed),
            echo_suppressed: self.echo_suppressed.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            closed_endpoints: self.closed_endpoints.load(Ordering::Relaxed),
            active_triggers,
            endpoints,
        }
    }
}

impl From<FanOut> for PublishReport {
    fn from(f: FanOut) -> Self {
        Self {
            delivered: f.delivered,
            filtered: f.filtered,
            dropped: f.dropped,
            remote_receivers: None,
        }
    }
}
