pub mod codec;
pub mod hub;
pub mod pubsub;
pub mod settings;

pub use codec::CodecError;
pub use hub::{HubError, HubResult, TransportOp, ANY_TRIGGER};
pub use pubsub::TryRecvError;
pub use settings::{LoggingError, SettingsError};
