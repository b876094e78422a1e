/// Hub settings loading.
pub mod config;
/// Error types: hub, codec, settings, stream.
pub mod error;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Typed trigger broadcast: Hub, TriggerStream, Payload.
pub mod pubsub;
/// Transport port, link reconciliation and the in-memory backend.
pub mod transport;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use self::config::{DeliveryConfig, HubSettings, OverflowPolicy, TransportConfig};
/// Hub errors and result type.
pub use error::{
    CodecError, HubError, HubResult, SettingsError, TransportOp, TryRecvError, ANY_TRIGGER,
};
/// Logging setup.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Broadcast API.
pub use pubsub::{
    Envelope, FanOut, Hub, HubStats, HubValue, Payload, PayloadKind, PublishReport,
    TriggerStream,
};
/// Transport API.
pub use transport::{InboundFeed, MemoryBackend, MemoryTransport, Transport, TransportError};
