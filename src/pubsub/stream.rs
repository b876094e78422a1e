use std::{
    fmt,
    future::poll_fn,
    marker::PhantomData,
    pin::Pin,
    sync::{Arc, Weak},
    task::{ready, Context, Poll},
};

use futures::Stream;

use super::{
    endpoint::{Endpoint, EndpointReceiver},
    hub::HubInner,
    EndpointId, HubValue,
};
use crate::error::{HubResult, TryRecvError};

/// Типизированный поток значений одного триггера.
///
/// Возвращается из `Hub::subscribe`. Регистрация происходит сразу, поэтому
/// значение, опубликованное до первого `recv`, не теряется.
///
/// Поток завершается (`None`) после `close` триггера, когда все значения,
/// поставленные в очередь до закрытия, прочитаны. `Drop` синхронно снимает
/// подписчика с реестра.
pub struct TriggerStream<T> {
    trigger: Arc<str>,
    id: EndpointId,
    receiver: EndpointReceiver,
    registration: Option<Registration>,
    _marker: PhantomData<fn() -> T>,
}

struct Registration {
    endpoint: Arc<Endpoint>,
    hub: Weak<HubInner>,
}

impl<T: HubValue> TriggerStream<T> {
    pub(crate) fn new(
        endpoint: Arc<Endpoint>,
        receiver: EndpointReceiver,
        hub: Weak<HubInner>,
    ) -> Self {
        Self {
            trigger: endpoint.trigger().clone(),
            id: endpoint.id(),
            receiver,
            registration: Some(Registration { endpoint, hub }),
            _marker: PhantomData,
        }
    }

    /// Ждёт следующее значение; `None` — триггер закрыт и очередь пуста.
    pub async fn recv(&mut self) -> Option<T> {
        poll_fn(|cx| self.poll_recv(cx)).await
    }

    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        loop {
            let payload = self.receiver.try_recv()?;
            if let Some(value) = T::from_payload(payload) {
                return Ok(value);
            }
        }
    }

    fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<T>> {
        loop {
            match ready!(self.receiver.poll_recv(cx)) {
                Some(payload) => {
                    // Хаб уже отфильтровал по типу, но поток не доверяет этому.
                    if let Some(value) = T::from_payload(payload) {
                        return Poll::Ready(Some(value));
                    }
                }
                None => return Poll::Ready(None),
            }
        }
    }

    /// Явная отписка. В отличие от `Drop`, дожидается закрытия подписки на
    /// транспорте, если этот подписчик был последним.
    pub async fn unsubscribe(mut self) -> HubResult<()> {
        let Some(registration) = self.registration.take() else {
            return Ok(());
        };
        let Some(hub) = registration.hub.upgrade() else {
            registration.endpoint.terminate();
            return Ok(());
        };
        if hub.detach(&registration.endpoint) {
            hub.reconcile(&self.trigger).await?;
        }
        Ok(())
    }
}

impl<T> TriggerStream<T> {
    pub fn trigger(&self) -> &Arc<str> {
        &self.trigger
    }

    pub fn endpoint_id(&self) -> EndpointId {
        self.id
    }

    /// `true`, когда новые значения больше не придут (триггер закрыт или
    /// хаб уничтожен). Уже стоящие в очереди значения ещё можно прочитать.
    pub fn is_terminated(&self) -> bool {
        self.registration
            .as_ref()
            .map_or(true, |r| !r.endpoint.is_alive())
    }

    /// Количество значений в очереди.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: HubValue> Stream for TriggerStream<T> {
    type Item = T;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<T>> {
        self.get_mut().poll_recv(cx)
    }
}

impl<T> Drop for TriggerStream<T> {
    fn drop(&mut self) {
        let Some(registration) = self.registration.take() else {
            return;
        };
        match registration.hub.upgrade() {
            Some(hub) => {
                if hub.detach(&registration.endpoint) {
                    hub.spawn_reconcile(self.trigger.clone());
                }
            }
            None => {
                registration.endpoint.terminate();
            }
        }
    }
}

impl<T> fmt::Debug for TriggerStream<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("TriggerStream")
            .field("trigger", &self.trigger)
            .field("id", &self.id)
            .field("queued", &self.len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use crate::{
        config::DeliveryConfig,
        error::TryRecvError,
        pubsub::{Hub, Payload},
    };

    #[tokio::test]
    async fn test_recv_in_publish_order() {
        let hub = Hub::default();
        let mut s = hub.subscribe_local::<i64>("initial");

        for i in 0..5_i64 {
            hub.publish_local("initial", Payload::Int(i));
        }
        for i in 0..5_i64 {
            assert_eq!(s.recv().await, Some(i));
        }
        assert_eq!(s.try_recv(), Err(TryRecvError::Empty));
    }

    /// Тест проверяет, что после close очередь дочитывается, затем поток
    /// завершается.
    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let hub = Hub::default();
        let mut s = hub.subscribe_local::<String>("t");
        hub.publish_local("t", Payload::from("a"));
        hub.publish_local("t", Payload::from("b"));

        assert_eq!(hub.close_local("t"), 1);
        assert!(s.is_terminated());
        assert_eq!(s.len(), 2);

        let rest: Vec<String> = timeout(Duration::from_millis(100), (&mut s).collect())
            .await
            .unwrap();
        assert_eq!(rest, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(s.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn test_drop_unregisters_synchronously() {
        let hub = Hub::default();
        let a = hub.subscribe_local::<bool>("flag");
        let b = hub.subscribe_local::<bool>("flag");
        assert_eq!(hub.subscriber_count("flag"), 2);

        drop(a);
        assert_eq!(hub.subscriber_count("flag"), 1);
        assert!(!b.is_terminated());

        drop(b);
        assert!(!hub.is_active("flag"));
    }

    #[tokio::test]
    async fn test_unsubscribe_without_transport() {
        let hub = Hub::default();
        let s = hub.subscribe_local::<f64>("temp");
        let other = hub.subscribe_local::<f64>("temp");

        s.unsubscribe().await.unwrap();
        assert_eq!(hub.subscriber_count("temp"), 1);
        drop(other);
        assert!(hub.active_triggers().is_empty());
    }

    /// Тест проверяет, что поток переживает уничтожение хаба и завершается.
    #[tokio::test]
    async fn test_stream_outlives_hub() {
        let hub = Hub::default();
        let mut s = hub.subscribe_local::<i64>("x");
        hub.publish_local("x", Payload::Int(1));
        drop(hub);

        assert!(s.is_terminated());
        assert_eq!(s.recv().await, Some(1));
        assert_eq!(s.recv().await, None);
    }

    #[tokio::test]
    async fn test_accessors() {
        let hub = Hub::with_delivery(DeliveryConfig::bounded(8));
        let s = hub.subscribe_local::<i64>("initial");
        assert_eq!(s.trigger().as_ref(), "initial");
        assert!(s.is_empty());
        assert!(format!("{s:?}").contains("initial"));

        let t = hub.subscribe_local::<i64>("initial");
        assert_ne!(s.endpoint_id(), t.endpoint_id());
    }
}
