use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{error::SettingsError, logging::LoggingConfig};

/// Ёмкость очереди одного подписчика по умолчанию.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;
/// Ёмкость входящего потока транспорта по умолчанию.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;
/// Префикс переменных окружения: `TRIGGER_HUB__DELIVERY__BUFFER_CAPACITY=64`.
pub const ENV_PREFIX: &str = "TRIGGER_HUB";

/// Что делать, когда очередь подписчика заполнена.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Ограниченная очередь; новое значение отбрасывается для этого
    /// подписчика.
    #[default]
    DropNewest,
    /// Неограниченная очередь; память растёт вместе с отставанием потребителя.
    Unbounded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeliveryConfig {
    pub buffer_capacity: usize,
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// Ёмкость входящего потока одной подписки в memory-бэкенде
    pub feed_capacity: usize,
}

/// Настройки хаба.
///
/// Источники в порядке приоритета: значения по умолчанию, файл (формат по
/// расширению: toml, yaml, json), переменные окружения с префиксом
/// `TRIGGER_HUB__`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub delivery: DeliveryConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

impl HubSettings {
    /// Загружает настройки из значений по умолчанию и окружения.
    pub fn load() -> Result<Self, SettingsError> {
        Self::build(None)
    }

    /// Как [`HubSettings::load`], но с обязательным файлом конфигурации.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("delivery.buffer_capacity", DEFAULT_BUFFER_CAPACITY as u64)?
            .set_default("delivery.overflow", "drop_newest")?
            .set_default("transport.feed_capacity", DEFAULT_FEED_CAPACITY as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: HubSettings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.delivery.overflow == OverflowPolicy::DropNewest && self.delivery.buffer_capacity == 0
        {
            return Err(SettingsError::invalid(
                "delivery.buffer_capacity",
                "must be greater than 0 with the drop_newest overflow policy",
            ));
        }
        if self.transport.feed_capacity == 0 {
            return Err(SettingsError::invalid(
                "transport.feed_capacity",
                "must be greater than 0",
            ));
        }
        self.logging.validate()?;
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

impl DeliveryConfig {
    pub fn bounded(buffer_capacity: usize) -> Self {
        Self {
            buffer_capacity,
            overflow: OverflowPolicy::DropNewest,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            buffer_capacity: 0,
            overflow: OverflowPolicy::Unbounded,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}
