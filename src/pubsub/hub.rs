use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::{
    codec::{self, Envelope},
    endpoint::{self, Delivery, Endpoint},
    FanOut, HubMetrics, HubStats, HubValue, Payload, PublishReport, TriggerRegistry,
    TriggerStream,
};
use crate::{
    config::{DeliveryConfig, HubSettings},
    error::{HubError, HubResult, TransportOp, ANY_TRIGGER},
    transport::{Transport, TransportLink},
};

/// Типизированный широковещательный хаб.
///
/// Раздаёт значения, опубликованные в именованный триггер, всем локальным
/// подписчикам с совпадающим типом. При подключённом транспорте держит
/// подписку на транспорте для каждого активного триггера и пересылает туда
/// локальные публикации.
///
/// Клонирование дешёвое: все клоны разделяют одно состояние.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

pub(crate) struct HubInner {
    pub(crate) id: Uuid,
    pub(crate) registry: TriggerRegistry,
    pub(crate) metrics: HubMetrics,
    delivery: DeliveryConfig,
    pub(crate) link: Option<TransportLink>,
}

impl Hub {
    /// Хаб без транспорта: только локальная рассылка.
    pub fn new(settings: &HubSettings) -> Self {
        Self::from_parts(settings.delivery, None)
    }

    pub fn with_delivery(delivery: DeliveryConfig) -> Self {
        Self::from_parts(delivery, None)
    }

    pub fn with_transport(
        settings: &HubSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::from_parts(settings.delivery, Some(TransportLink::new(transport)))
    }

    fn from_parts(
        delivery: DeliveryConfig,
        link: Option<TransportLink>,
    ) -> Self {
        let inner = HubInner {
            id: Uuid::new_v4(),
            registry: TriggerRegistry::new(),
            metrics: HubMetrics::new(),
            delivery,
            link,
        };
        debug!(
            hub = %inner.id,
            buffer_capacity = delivery.buffer_capacity,
            overflow = ?delivery.overflow,
            transport = inner.link.is_some(),
            "Hub created"
        );
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Идентификатор хаба; записывается в конверт исходящих сообщений.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn has_transport(&self) -> bool {
        self.inner.link.is_some()
    }

    /// Подписка на триггер.
    ///
    /// Подписчик регистрируется сразу. При подключённом транспорте метод
    /// возвращается только после того, как подписка на транспорте открыта;
    /// если открыть её не удалось, подписчик снимается и возвращается ошибка.
    pub async fn subscribe<T: HubValue>(
        &self,
        trigger: &str,
    ) -> HubResult<TriggerStream<T>> {
        let stream = self.register::<T>(trigger);
        if let Err(err) = self.inner.reconcile(stream.trigger()).await {
            err.log("Subscribe failed, endpoint removed");
            drop(stream);
            return Err(err);
        }
        Ok(stream)
    }

    /// Синхронная подписка.
    ///
    /// Подписчик регистрируется сразу и видит все последующие локальные
    /// публикации. При подключённом транспорте подписка на транспорте
    /// открывается в фоне, поэтому сообщения других хабов начнут приходить
    /// чуть позже; ошибка фонового открытия только пишется в журнал.
    pub fn subscribe_local<T: HubValue>(
        &self,
        trigger: &str,
    ) -> TriggerStream<T> {
        let stream = self.register::<T>(trigger);
        self.inner.spawn_reconcile(stream.trigger().clone());
        stream
    }

    fn register<T: HubValue>(
        &self,
        trigger: &str,
    ) -> TriggerStream<T> {
        let trigger: Arc<str> = Arc::from(trigger);
        let (tx, rx) = endpoint::channel(&self.inner.delivery);
        let endpoint = Arc::new(Endpoint::new(
            self.inner.registry.next_endpoint_id(),
            trigger.clone(),
            T::KIND,
            tx,
        ));
        let activated = self.inner.registry.register(endpoint.clone());
        debug!(
            trigger = %trigger,
            endpoint = %endpoint.id(),
            kind = %T::KIND,
            activated,
            "Endpoint registered"
        );
        TriggerStream::new(endpoint, rx, Arc::downgrade(&self.inner))
    }

    /// Публикация: локальная рассылка, затем пересылка в транспорт.
    ///
    /// Отсутствие подписчиков ошибкой не является. Ошибка транспорта
    /// возвращается уже после того, как локальные подписчики получили
    /// значение.
    pub async fn publish(
        &self,
        trigger: &str,
        value: impl Into<Payload>,
    ) -> HubResult<PublishReport> {
        let payload = value.into();
        let mut report = PublishReport::from(self.inner.fan_out(trigger, &payload));

        if let Some(link) = &self.inner.link {
            let bytes = codec::encode(&Envelope::new(Some(self.inner.id), payload))?;
            let receivers = link
                .transport()
                .publish(trigger, bytes)
                .await
                .map_err(|source| {
                    let err = HubError::transport(trigger, TransportOp::Publish, source);
                    err.log("Transport publish failed");
                    err
                })?;
            report.remote_receivers = Some(receivers);
        }

        Ok(report)
    }

    /// Только локальная рассылка; этим путём идут входящие сообщения
    /// транспорта.
    pub fn publish_local(
        &self,
        trigger: &str,
        payload: Payload,
    ) -> FanOut {
        self.inner.fan_out(trigger, &payload)
    }

    /// Закрывает триггер: завершает всех локальных подписчиков и закрывает
    /// подписку на транспорте. Повторный вызов возвращает `0`.
    pub async fn close(
        &self,
        trigger: &str,
    ) -> HubResult<usize> {
        let closed = self.inner.close_local(trigger);
        self.inner.reconcile(&Arc::from(trigger)).await?;
        Ok(closed)
    }

    /// Синхронное закрытие триггера. Подписка на транспорте, если она
    /// есть, закрывается в фоне.
    pub fn close_local(
        &self,
        trigger: &str,
    ) -> usize {
        let closed = self.inner.close_local(trigger);
        self.inner.spawn_reconcile(Arc::from(trigger));
        closed
    }

    /// Активные триггеры, отсортированные по имени.
    pub fn active_triggers(&self) -> Vec<String> {
        self.inner
            .registry
            .active_triggers()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    pub fn is_active(
        &self,
        trigger: &str,
    ) -> bool {
        self.inner.registry.contains(trigger)
    }

    pub fn subscriber_count(
        &self,
        trigger: &str,
    ) -> usize {
        self.inner.registry.subscriber_count(trigger)
    }

    pub fn stats(&self) -> HubStats {
        let registry = &self.inner.registry;
        self.inner
            .metrics
            .snapshot(registry.len(), registry.endpoint_count())
    }

    /// Активные триггеры с точки зрения транспорта; без транспорта пусто.
    pub async fn remote_active_triggers(&self) -> HubResult<Vec<String>> {
        let Some(link) = &self.inner.link else {
            return Ok(Vec::new());
        };
        let mut triggers = link
            .transport()
            .active_triggers()
            .await
            .map_err(|source| {
                let err = HubError::transport(ANY_TRIGGER, TransportOp::Query, source);
                err.log("Transport query failed");
                err
            })?;
        triggers.sort();
        Ok(triggers)
    }

    /// Триггеры, для которых сейчас открыта подписка на транспорте.
    pub async fn linked_triggers(&self) -> Vec<String> {
        match &self.inner.link {
            Some(link) => link
                .linked_triggers()
                .await
                .iter()
                .map(|t| t.to_string())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_delivery(DeliveryConfig::default())
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.inner.id)
            .field("active_triggers", &self.inner.registry.len())
            .field("transport", &self.inner.link.is_some())
            .finish()
    }
}

impl HubInner {
    pub(crate) fn fan_out(
        &self,
        trigger: &str,
        payload: &Payload,
    ) -> FanOut {
        let kind = payload.kind();
        let mut fan_out = FanOut::default();

        for endpoint in self.registry.snapshot(trigger) {
            if !endpoint.accepts(kind) {
                fan_out.filtered += 1;
                continue;
            }
            match endpoint.deliver(payload.clone()) {
                Delivery::Delivered => fan_out.delivered += 1,
                Delivery::Overflow => {
                    fan_out.dropped += 1;
                    warn!(
                        trigger,
                        endpoint = %endpoint.id(),
                        "Endpoint queue is full, value dropped"
                    );
                }
                Delivery::Closed => {}
            }
        }

        self.metrics.record_fan_out(&fan_out);
        fan_out
    }

    pub(crate) fn close_local(
        &self,
        trigger: &str,
    ) -> usize {
        let closed = self.registry.remove_trigger(trigger).len();
        if closed > 0 {
            self.metrics.record_closed(closed);
            info!(trigger, endpoints = closed, "Trigger closed");
        }
        closed
    }

    /// Снимает подписчика с реестра. Возвращает `true`, если триггер стал
    /// неактивным.
    pub(crate) fn detach(
        &self,
        endpoint: &Endpoint,
    ) -> bool {
        let res = self.registry.unregister(endpoint.trigger(), endpoint.id());
        if res.removed {
            debug!(
                trigger = %endpoint.trigger(),
                endpoint = %endpoint.id(),
                trigger_emptied = res.trigger_emptied,
                "Endpoint unregistered"
            );
        }
        res.trigger_emptied
    }

    /// Приводит подписку на транспорте к состоянию реестра.
    pub(crate) async fn reconcile(
        self: &Arc<Self>,
        trigger: &Arc<str>,
    ) -> HubResult<()> {
        match &self.link {
            Some(link) => link.reconcile(self, trigger).await,
            None => Ok(()),
        }
    }

    /// Фоновый reconcile для синхронных путей (`Drop`, `*_local`), где нельзя
    /// ждать.
    pub(crate) fn spawn_reconcile(
        self: &Arc<Self>,
        trigger: Arc<str>,
    ) {
        if self.link.is_none() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let hub = Arc::clone(self);
                handle.spawn(async move {
                    if let Err(err) = hub.reconcile(&trigger).await {
                        err.log("Background reconcile failed");
                    }
                });
            }
            Err(_) => {
                warn!(
                    trigger = %trigger,
                    "No tokio runtime, transport link left as is until next reconcile"
                );
            }
        }
    }

    /// Входящее сообщение транспорта.
    pub(crate) fn accept_inbound(
        &self,
        trigger: &str,
        bytes: Bytes,
    ) {
        self.metrics.record_inbound();
        let len = bytes.len();
        let (envelope, foreign) = codec::decode_inbound(bytes);

        if foreign {
            self.metrics.record_decode_error();
            warn!(
                trigger,
                len, "Inbound message is not an envelope, delivering raw bytes"
            );
        }
        if envelope.origin == Some(self.id) {
            self.metrics.record_echo();
            trace!(trigger, "Own message echoed by transport, skipped");
            return;
        }

        self.fan_out(trigger, &envelope.payload);
    }
}
