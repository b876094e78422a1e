use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, trace};

use super::{InboundFeed, Transport};
use crate::{
    error::{HubError, HubResult, TransportOp},
    pubsub::hub::HubInner,
};

/// Связь реестра хаба с подписками на транспорте.
///
/// Для каждого активного триггера держится одна подписка на транспорте и
/// задача-пересыльщик, которая передаёт входящие сообщения в локальную
/// рассылку. Все изменения выполняются под асинхронным мьютексом через
/// [`TransportLink::reconcile`]: желаемое состояние (триггер есть в реестре)
/// сравнивается с фактическим (подписка открыта), и применяется разница.
pub struct TransportLink {
    transport: Arc<dyn Transport>,
    links: Mutex<HashMap<Arc<str>, LinkState>>,
    next_generation: AtomicU64,
}

struct LinkState {
    /// Отличает текущую подписку от заменённой, чей пересыльщик ещё
    /// завершается.
    generation: u64,
    forwarder: JoinHandle<()>,
}

impl TransportLink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            links: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Приводит подписку на транспорте для `trigger` к состоянию реестра.
    pub(crate) async fn reconcile(
        &self,
        hub: &Arc<HubInner>,
        trigger: &Arc<str>,
    ) -> HubResult<()> {
        let mut links = self.links.lock().await;
        let desired = hub.registry.contains(trigger);
        let open = links.contains_key(trigger);

        match (desired, open) {
            (true, false) => {
                let feed = self.transport.subscribe(trigger).await.map_err(|source| {
                    let err = HubError::transport(trigger, TransportOp::Subscribe, source);
                    err.log("Transport subscribe failed");
                    err
                })?;
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let forwarder = tokio::spawn(forward(
                    Arc::downgrade(hub),
                    trigger.clone(),
                    generation,
                    feed,
                ));
                links.insert(
                    trigger.clone(),
                    LinkState {
                        generation,
                        forwarder,
                    },
                );
                debug!(trigger = %trigger, generation, "Transport link opened");
            }
            (false, true) => {
                let result = self.transport.unsubscribe(trigger).await;
                if let Some(state) = links.remove(trigger) {
                    state.forwarder.abort();
                }
                match result {
                    Ok(()) => debug!(trigger = %trigger, "Transport link closed"),
                    Err(source) => {
                        let err = HubError::transport(trigger, TransportOp::Unsubscribe, source);
                        err.log("Transport unsubscribe failed");
                        return Err(err);
                    }
                }
            }
            _ => trace!(trigger = %trigger, desired, "Transport link already in sync"),
        }
        Ok(())
    }

    /// Подписка на транспорте исчезла со стороны бэкенда. Если это всё ещё
    /// текущая подписка, триггер закрывается локально.
    ///
    /// Возвращает `true`, если связь была снята этим вызовом.
    pub(crate) async fn teardown(
        &self,
        hub: &HubInner,
        trigger: &Arc<str>,
        generation: u64,
    ) -> bool {
        let mut links = self.links.lock().await;
        match links.get(trigger) {
            Some(state) if state.generation == generation => {
                links.remove(trigger);
                let closed = hub.close_local(trigger);
                info!(
                    trigger = %trigger,
                    endpoints = closed,
                    "Transport subscription ended remotely, trigger closed"
                );
                true
            }
            _ => false,
        }
    }

    /// Триггеры с открытой подпиской на транспорте, отсортированные.
    pub async fn linked_triggers(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.links.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Drop for TransportLink {
    fn drop(&mut self) {
        for state in self.links.get_mut().values() {
            state.forwarder.abort();
        }
    }
}

impl fmt::Debug for TransportLink {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TransportLink")
            .field("next_generation", &self.next_generation)
            .finish_non_exhaustive()
    }
}

/// Пересыльщик: входящие сообщения транспорта → локальная рассылка.
async fn forward(
    hub: Weak<HubInner>,
    trigger: Arc<str>,
    generation: u64,
    mut feed: InboundFeed,
) {
    while let Some(bytes) = feed.recv().await {
        let Some(hub) = hub.upgrade() else {
            return;
        };
        hub.accept_inbound(&trigger, bytes);
    }

    let Some(hub) = hub.upgrade() else {
        return;
    };
    if let Some(link) = &hub.link {
        link.teardown(&hub, &trigger, generation).await;
    }
}
