pub mod settings;

pub use settings::{
    DeliveryConfig, HubSettings, OverflowPolicy, TransportConfig, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_FEED_CAPACITY, ENV_PREFIX,
};
