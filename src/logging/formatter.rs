use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer,
    registry::LookupSpan,
};

use crate::logging::config::{ConsoleConfig, FileConfig, LogFormat};

/// Boxed слой: стирает конкретный тип формата (json/pretty/compact) и writer.
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Параметры форматирования, общие для консольного и файлового вывода.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerOptions {
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl LayerOptions {
    pub fn console(config: &ConsoleConfig) -> Self {
        Self {
            format: config.format,
            with_ansi: config.with_ansi,
            with_target: config.with_target,
            with_thread_ids: config.with_thread_ids,
            with_line_numbers: config.with_line_numbers,
        }
    }

    /// Для файла ANSI-последовательности всегда выключены.
    pub fn file(config: &FileConfig) -> Self {
        Self {
            format: config.format,
            with_ansi: false,
            with_target: true,
            with_thread_ids: true,
            with_line_numbers: true,
        }
    }
}

/// Строит fmt-слой с заданным форматом поверх произвольного writer.
pub fn build_formatter<S, W>(
    options: LayerOptions,
    writer: W,
) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match options.format {
        LogFormat::Json => Box::new(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(options.with_target)
                .with_thread_ids(options.with_thread_ids)
                .with_line_number(options.with_line_numbers),
        ),
        LogFormat::Pretty => Box::new(
            fmt::layer()
                .pretty()
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_ansi(options.with_ansi)
                .with_target(options.with_target)
                .with_thread_ids(options.with_thread_ids)
                .with_line_number(options.with_line_numbers),
        ),
        LogFormat::Compact => Box::new(
            fmt::layer()
                .compact()
                .with_writer(writer)
                .with_ansi(options.with_ansi)
                .with_target(options.with_target)
                .with_thread_ids(options.with_thread_ids)
                .with_line_number(options.with_line_numbers),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::{prelude::*, registry::Registry};

    use super::*;

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(format: LogFormat) -> String {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedBuf(buf.clone());
        let options = LayerOptions {
            format,
            with_ansi: false,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        };
        let layer = build_formatter::<Registry, _>(options, move || writer.clone());
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(trigger = "initial", "endpoint registered");
        });
        let out = buf.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Тест проверяет, что json-формат выдаёт разбираемый JSON с полями
    /// события.
    #[test]
    fn test_json_format_is_parseable() {
        let out = capture(LogFormat::Json);
        let line = out.lines().next().expect("no output");
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(v["fields"]["trigger"], "initial");
        assert_eq!(v["fields"]["message"], "endpoint registered");
    }

    /// Тест проверяет, что compact и pretty выводят сообщение.
    #[test]
    fn test_text_formats_contain_message() {
        for format in [LogFormat::Compact, LogFormat::Pretty] {
            let out = capture(format);
            assert!(out.contains("endpoint registered"), "{format}: {out}");
        }
    }

    #[test]
    fn test_file_options_disable_ansi() {
        let opts = LayerOptions::file(&FileConfig::default());
        assert!(!opts.with_ansi);
        assert_eq!(opts.format, LogFormat::Json);
    }
}
