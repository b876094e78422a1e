use std::io::{self, Stdout};

use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::LoggingConfig,
    formatter::{self, BoxedLayer, LayerOptions},
};

/// Консольный слой (stdout) с форматом из конфигурации.
pub fn layer_with_config<S>(config: &LoggingConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let writer: fn() -> Stdout = io::stdout;
    formatter::build_formatter(LayerOptions::console(&config.console), writer)
}

#[cfg(test)]
mod tests {
    use tracing::info;
    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;
    use crate::logging::config::{ConsoleConfig, LogFormat};

    /// Тест проверяет, что слой можно зарегистрировать при любых
    /// комбинациях формата и ANSI, и логирование не паникует.
    #[test]
    fn test_layer_with_config_various_flags() {
        for format in [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json] {
            for with_ansi in [true, false] {
                let cfg = LoggingConfig {
                    console: ConsoleConfig {
                        format,
                        with_ansi,
                        ..Default::default()
                    },
                    ..Default::default()
                };
                let subscriber = Registry::default().with(layer_with_config(&cfg));
                tracing::subscriber::with_default(subscriber, || {
                    info!(%format, with_ansi, "console sink smoke test");
                });
            }
        }
    }
}
