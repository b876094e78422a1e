use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Payload, PayloadKind};
use crate::config::{DeliveryConfig, OverflowPolicy};

/// Идентификатор подписчика, уникальный в пределах одного хаба.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(pub u64);

/// Итог передачи значения одному подписчику.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Очередь заполнена, значение отброшено.
    Overflow,
    /// Подписчик уже закрыт.
    Closed,
}

pub(crate) enum EndpointSender {
    Bounded(mpsc::Sender<Payload>),
    Unbounded(mpsc::UnboundedSender<Payload>),
}

pub(crate) enum EndpointReceiver {
    Bounded(mpsc::Receiver<Payload>),
    Unbounded(mpsc::UnboundedReceiver<Payload>),
}

/// Сторона доставки одного подписчика.
///
/// Пока отправитель присутствует, подписчик считается живым. Реестр держит
/// `Arc<Endpoint>`, а приёмник принадлежит потоку потребителя.
pub struct Endpoint {
    id: EndpointId,
    trigger: Arc<str>,
    kind: PayloadKind,
    sender: Mutex<Option<EndpointSender>>,
}

/// Очередь доставки в соответствии с политикой переполнения.
pub(crate) fn channel(config: &DeliveryConfig) -> (EndpointSender, EndpointReceiver) {
    match config.overflow {
        OverflowPolicy::DropNewest => {
            let (tx, rx) = mpsc::channel(config.buffer_capacity.max(1));
            (EndpointSender::Bounded(tx), EndpointReceiver::Bounded(rx))
        }
        OverflowPolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                EndpointSender::Unbounded(tx),
                EndpointReceiver::Unbounded(rx),
            )
        }
    }
}

impl Endpoint {
    pub(crate) fn new(
        id: EndpointId,
        trigger: Arc<str>,
        kind: PayloadKind,
        sender: EndpointSender,
    ) -> Self {
        Self {
            id,
            trigger,
            kind,
            sender: Mutex::new(Some(sender)),
        }
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn trigger(&self) -> &Arc<str> {
        &self.trigger
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn is_alive(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub fn accepts(
        &self,
        kind: PayloadKind,
    ) -> bool {
        self.kind == kind
    }

    /// Неблокирующая передача значения.
    pub(crate) fn deliver(
        &self,
        payload: Payload,
    ) -> Delivery {
        let guard = self.sender.lock();
        match guard.as_ref() {
            None => Delivery::Closed,
            Some(EndpointSender::Bounded(tx)) => match tx.try_send(payload) {
                Ok(()) => Delivery::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Overflow,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
            },
            Some(EndpointSender::Unbounded(tx)) => match tx.send(payload) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            },
        }
    }

    /// Убирает отправителя. Уже поставленные в очередь значения остаются
    /// доступны приёмнику, после них поток завершается.
    ///
    /// Возвращает `true`, если подписчик был жив.
    pub(crate) fn terminate(&self) -> bool {
        self.sender.lock().take().is_some()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .field("kind", &self.kind)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl EndpointReceiver {
    pub(crate) fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Payload>> {
        match self {
            Self::Bounded(rx) => rx.poll_recv(cx),
            Self::Unbounded(rx) => rx.poll_recv(cx),
        }
    }

    pub(crate) fn try_recv(&mut self) -> Result<Payload, mpsc::error::TryRecvError> {
        match self {
            Self::Bounded(rx) => rx.try_recv(),
            Self::Unbounded(rx) => rx.try_recv(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Bounded(rx) => rx.len(),
            Self::Unbounded(rx) => rx.len(),
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
