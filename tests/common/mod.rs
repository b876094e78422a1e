#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::{sleep, timeout};
use trigger_hub::{
    Hub, HubSettings, HubValue, InboundFeed, MemoryBackend, MemoryTransport, Transport,
    TransportError, TriggerStream,
};

pub const WAIT: Duration = Duration::from_secs(1);

/// Хаб, подключённый к общему memory-бэкенду.
pub fn linked_hub(backend: &MemoryBackend) -> Hub {
    Hub::with_transport(&HubSettings::default(), Arc::new(backend.connect()))
}

/// Следующее значение потока или `None`, если поток завершился.
/// Паникует по таймауту.
pub async fn next<T: HubValue>(stream: &mut TriggerStream<T>) -> Option<T> {
    timeout(WAIT, stream.recv())
        .await
        .expect("timed out waiting for stream")
}

/// Ждёт, пока условие не станет истинным.
pub async fn eventually<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    timeout(WAIT, async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Транспорт поверх memory-бэкенда, которому можно приказать падать.
pub struct FlakyTransport {
    inner: MemoryTransport,
    pub fail_publish: AtomicBool,
    pub fail_subscribe: AtomicBool,
    pub fail_unsubscribe: AtomicBool,
    pub fail_query: AtomicBool,
}

impl FlakyTransport {
    pub fn new(backend: &MemoryBackend) -> Arc<Self> {
        Arc::new(Self {
            inner: backend.connect(),
            fail_publish: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            fail_unsubscribe: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
        })
    }
}

pub fn set(
    flag: &AtomicBool,
    value: bool,
) {
    flag.store(value, Ordering::SeqCst);
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn publish(
        &self,
        trigger: &str,
        payload: Bytes,
    ) -> Result<usize, TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Publish {
                trigger: trigger.to_string(),
                reason: "broken pipe".into(),
            });
        }
        self.inner.publish(trigger, payload).await
    }

    async fn subscribe(
        &self,
        trigger: &str,
    ) -> Result<InboundFeed, TransportError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(TransportError::Subscribe {
                trigger: trigger.to_string(),
                reason: "server unavailable".into(),
            });
        }
        self.inner.subscribe(trigger).await
    }

    async fn unsubscribe(
        &self,
        trigger: &str,
    ) -> Result<(), TransportError> {
        if self.fail_unsubscribe.load(Ordering::SeqCst) {
            return Err(TransportError::Unsubscribe {
                trigger: trigger.to_string(),
                reason: "server unavailable".into(),
            });
        }
        self.inner.unsubscribe(trigger).await
    }

    async fn active_triggers(&self) -> Result<Vec<String>, TransportError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(TransportError::Query {
                reason: "malformed reply".into(),
            });
        }
        self.inner.active_triggers().await
    }
}
