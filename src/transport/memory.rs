use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

use super::{InboundFeed, Transport, TransportError};
use crate::config::TransportConfig;

/// Внутрипроцессный pub/sub сервер.
///
/// Играет роль сетевого бэкенда: хранит подписки соединений по триггерам и
/// раздаёт опубликованные байты во входящие потоки подписчиков. Каналы без
/// подписчиков удаляются сразу.
///
/// Клонирование дешёвое: все клоны указывают на один сервер.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<BackendInner>,
}

struct BackendInner {
    /// Триггер → подписки соединений
    channels: DashMap<Arc<str>, Vec<Subscriber>>,
    next_conn: AtomicU64,
    /// Ёмкость входящего потока одной подписки
    feed_capacity: usize,
    /// Общее количество вызовов `publish`
    publish_count: AtomicUsize,
    /// Количество сообщений, не поместившихся во входящий поток
    send_error_count: AtomicUsize,
}

struct Subscriber {
    conn: u64,
    tx: mpsc::Sender<Bytes>,
}

/// Соединение с [`MemoryBackend`], реализующее [`Transport`].
///
/// При уничтожении соединения все его подписки снимаются.
pub struct MemoryTransport {
    backend: MemoryBackend,
    conn: u64,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                channels: DashMap::new(),
                next_conn: AtomicU64::new(0),
                feed_capacity: feed_capacity.max(1),
                publish_count: AtomicUsize::new(0),
                send_error_count: AtomicUsize::new(0),
            }),
        }
    }

    pub fn from_settings(config: &TransportConfig) -> Self {
        Self::new(config.feed_capacity)
    }

    /// Открывает новое соединение.
    pub fn connect(&self) -> MemoryTransport {
        let conn = self.inner.next_conn.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(conn, "Memory transport connected");
        MemoryTransport {
            backend: self.clone(),
            conn,
            closed: AtomicBool::new(false),
        }
    }

    /// Публикация сырых байт, как это сделал бы сторонний клиент.
    ///
    /// Возвращает число подписок, получивших сообщение. Подписки с закрытым
    /// входящим потоком удаляются; переполненный поток увеличивает
    /// `send_error_count`.
    pub fn publish(
        &self,
        trigger: &str,
        payload: Bytes,
    ) -> usize {
        let inner = &self.inner;
        inner.publish_count.fetch_add(1, Ordering::Relaxed);

        let Some(mut entry) = inner.channels.get_mut(trigger) else {
            return 0;
        };
        let mut received = 0;
        entry.retain(|sub| match sub.tx.try_send(payload.clone()) {
            Ok(()) => {
                received += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                inner.send_error_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        let emptied = entry.is_empty();
        drop(entry);
        if emptied {
            inner.channels.remove_if(trigger, |_, subs| subs.is_empty());
        }

        trace!(trigger, received, "Memory backend publish");
        received
    }

    /// Снимает все подписки триггера на стороне сервера. Входящие потоки
    /// подписчиков завершаются.
    ///
    /// Возвращает число снятых подписок.
    pub fn unsubscribe_all(
        &self,
        trigger: &str,
    ) -> usize {
        let removed = self
            .inner
            .channels
            .remove(trigger)
            .map_or(0, |(_, subs)| subs.len());
        debug!(trigger, removed, "Memory backend dropped all subscriptions");
        removed
    }

    /// Триггеры с живыми подписками, отсортированные.
    pub fn active_triggers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .channels
            .iter()
            .filter(|entry| entry.value().iter().any(|sub| !sub.tx.is_closed()))
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn subscriber_count(
        &self,
        trigger: &str,
    ) -> usize {
        self.inner.channels.get(trigger).map_or(0, |subs| {
            subs.iter().filter(|sub| !sub.tx.is_closed()).count()
        })
    }

    pub fn publish_count(&self) -> usize {
        self.inner.publish_count.load(Ordering::Relaxed)
    }

    pub fn send_error_count(&self) -> usize {
        self.inner.send_error_count.load(Ordering::Relaxed)
    }

    fn subscribe(
        &self,
        conn: u64,
        trigger: &str,
    ) -> InboundFeed {
        let (tx, rx) = mpsc::channel(self.inner.feed_capacity);
        let mut entry = self.inner.channels.entry(Arc::from(trigger)).or_default();
        entry.retain(|sub| sub.conn != conn);
        entry.push(Subscriber { conn, tx });
        rx
    }

    fn unsubscribe(
        &self,
        conn: u64,
        trigger: &str,
    ) {
        if let Some(mut entry) = self.inner.channels.get_mut(trigger) {
            entry.retain(|sub| sub.conn != conn);
            let emptied = entry.is_empty();
            drop(entry);
            if emptied {
                self.inner
                    .channels
                    .remove_if(trigger, |_, subs| subs.is_empty());
            }
        }
    }

    fn drop_connection(
        &self,
        conn: u64,
    ) {
        self.inner.channels.retain(|_, subs| {
            subs.retain(|sub| sub.conn != conn);
            !subs.is_empty()
        });
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::from_settings(&TransportConfig::default())
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("channels", &self.inner.channels.len())
            .field("feed_capacity", &self.inner.feed_capacity)
            .finish()
    }
}

impl MemoryTransport {
    pub fn backend(&self) -> &MemoryBackend {
        &self.backend
    }

    /// Закрывает соединение: подписки снимаются, дальнейшие операции
    /// возвращают [`TransportError::Closed`].
    pub fn disconnect(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.backend.drop_connection(self.conn);
            debug!(conn = self.conn, "Memory transport disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(
        &self,
        trigger: &str,
        payload: Bytes,
    ) -> Result<usize, TransportError> {
        self.ensure_open()?;
        Ok(self.backend.publish(trigger, payload))
    }

    async fn subscribe(
        &self,
        trigger: &str,
    ) -> Result<InboundFeed, TransportError> {
        self.ensure_open()?;
        Ok(self.backend.subscribe(self.conn, trigger))
    }

    async fn unsubscribe(
        &self,
        trigger: &str,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.backend.unsubscribe(self.conn, trigger);
        Ok(())
    }

    async fn active_triggers(&self) -> Result<Vec<String>, TransportError> {
        self.ensure_open()?;
        Ok(self.backend.active_triggers())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("conn", &self.conn)
            .field("connected", &self.is_connected())
            .finish()
    }
}
