//! Демонстрация trigger-hub.
//!
//! Поднимает два хаба на одном memory-бэкенде: первый подписывается на
//! триггер, второй публикует в него. Значения доходят до подписчиков через
//! транспорт, значения чужого типа отфильтровываются.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::timeout;
use tracing::{info, warn};
use trigger_hub::{init_logging, Hub, HubSettings, MemoryBackend};

#[derive(Parser)]
#[command(name = "trigger-hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Typed trigger broadcast hub demo", long_about = None)]
struct Cli {
    /// Файл конфигурации (toml, yaml или json)
    #[arg(short, long, env = "TRIGGER_HUB_CONFIG")]
    config: Option<PathBuf>,
    /// Имя триггера
    #[arg(short, long, default_value = "initial")]
    trigger: String,
    /// Количество публикуемых чисел
    #[arg(short, long, default_value_t = 3)]
    messages: i64,
    /// Сколько ждать каждое значение, в миллисекундах
    #[arg(long, default_value_t = 500)]
    wait_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => HubSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => HubSettings::load().context("failed to load settings")?,
    };
    let logging = init_logging(settings.logging.clone()).context("failed to init logging")?;

    let backend = MemoryBackend::from_settings(&settings.transport);
    let listener = Hub::with_transport(&settings, Arc::new(backend.connect()));
    let publisher = Hub::with_transport(&settings, Arc::new(backend.connect()));

    let mut first = listener.subscribe::<i64>(&cli.trigger).await?;
    let mut second = listener.subscribe::<i64>(&cli.trigger).await?;
    info!(
        trigger = %cli.trigger,
        remote = ?listener.remote_active_triggers().await?,
        "Listener subscribed"
    );

    publisher.publish(&cli.trigger, "invalid").await?;
    for i in 0..cli.messages {
        let report = publisher.publish(&cli.trigger, i).await?;
        info!(value = i, remote_receivers = ?report.remote_receivers, "Published");
    }

    let wait = Duration::from_millis(cli.wait_ms);
    for _ in 0..cli.messages {
        for (name, stream) in [("first", &mut first), ("second", &mut second)] {
            match timeout(wait, stream.recv()).await {
                Ok(Some(value)) => println!("{name}: {value}"),
                Ok(None) => warn!(subscriber = name, "Stream ended early"),
                Err(_) => warn!(subscriber = name, "Timed out waiting for value"),
            }
        }
    }

    let closed = listener.close(&cli.trigger).await?;
    info!(trigger = %cli.trigger, closed, "Trigger closed");
    wait_for_end(&mut first, wait).await;
    wait_for_end(&mut second, wait).await;

    println!(
        "listener: {}",
        serde_json::to_string_pretty(&listener.stats())?
    );
    println!(
        "publisher: {}",
        serde_json::to_string_pretty(&publisher.stats())?
    );
    println!(
        "backend active triggers: {:?}",
        backend.active_triggers()
    );

    logging.shutdown();
    Ok(())
}

async fn wait_for_end(
    stream: &mut trigger_hub::TriggerStream<i64>,
    wait: Duration,
) {
    if !matches!(timeout(wait, stream.recv()).await, Ok(None)) {
        warn!(trigger = %stream.trigger(), "Stream did not end after close");
    }
}
