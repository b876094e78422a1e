//! Логирование на базе `tracing`: консольный и файловый вывод, фильтры из
//! конфигурации и `RUST_LOG`.

pub mod config;
mod filters;
pub mod formatter;
pub mod handle;
pub mod sinks;

pub use self::config::{ConsoleConfig, FileConfig, FileRotation, LogFormat, LoggingConfig};
pub use handle::{LoggingHandle, LoggingStats};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::error::LoggingError;

/// Инициализация глобального подписчика по конфигурации.
///
/// Повторный вызов в том же процессе возвращает [`LoggingError::Init`].
pub fn init_logging(mut config: LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers: Vec<formatter::BoxedLayer<Registry>> = Vec::new();

    if config.console_enabled && config.console.enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file_enabled && config.file.enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(&config)?;
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_dir = %config.log_dir.display(),
        console_enabled = config.console_enabled,
        file_enabled = config.file_enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
