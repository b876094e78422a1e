use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::registry::LookupSpan;

use crate::{
    error::LoggingError,
    logging::{
        config::{FileRotation, LoggingConfig},
        formatter::{self, BoxedLayer, LayerOptions},
    },
};

/// Файловый слой с ротацией и неблокирующей записью.
///
/// Возвращённый `WorkerGuard` должен жить до конца работы процесса, иначе
/// буферизованные записи будут потеряны.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> Result<(BoxedLayer<S>, WorkerGuard), LoggingError>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let rotation = match config.file.rotation {
        FileRotation::Hourly => Rotation::HOURLY,
        FileRotation::Daily => Rotation::DAILY,
        FileRotation::Never => Rotation::NEVER,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.file.filename_prefix.as_str())
        .build(&config.log_dir)
        .map_err(|e| LoggingError::Init(format!("file appender: {e}")))?;

    let (writer, guard) = non_blocking(appender);
    let layer = formatter::build_formatter(LayerOptions::file(&config.file), writer);

    Ok((layer, guard))
}
