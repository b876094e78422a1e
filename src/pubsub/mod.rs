//! Типизированная рассылка по триггерам.
//!
//! - `payload`: значения, которые можно опубликовать, и их виды.
//! - `endpoint`: сторона доставки одного подписчика.
//! - `registry`: реестр триггер → подписчики.
//! - `stream`: типизированный поток подписчика.
//! - `hub`: публикация, подписка, закрытие и связь с транспортом.
//! - `metrics`: счётчики и отчёты рассылки.
//! - `codec`: конверт сообщения на транспорте.

pub mod codec;
pub mod endpoint;
pub mod hub;
pub mod metrics;
pub mod payload;
pub mod registry;
pub mod stream;

pub use codec::Envelope;
pub use endpoint::{Delivery, Endpoint, EndpointId};
pub use hub::Hub;
pub use metrics::{FanOut, HubMetrics, HubStats, PublishReport};
pub use payload::{HubValue, Payload, PayloadKind};
pub use registry::{TriggerRegistry, Unregistered};
pub use stream::TriggerStream;
