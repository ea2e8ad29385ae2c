mod bot;
mod cache;
mod config;
mod gemini;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use bot::{HistoryStore, MessageHandler, OverrideStore, spawn_history_writer};
use cache::RedisStore;
use config::Config;
use gemini::GeminiClient;
use transport::GatewayClient;

/// How long shutdown waits for queued history writes to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging: stdout always, non-blocking file layer when configured.
    let mut _file_guard = None;
    let file_layer = config.log_dir.as_ref().map(|dir| {
        std::fs::create_dir_all(dir).ok();
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("nightshift.log"))
            .expect("Failed to open log file");
        let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
        _file_guard = Some(guard);
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_layer)
        .init();

    info!("🚀 Starting nightshift...");
    info!("Mode: {:?}, timezone: {}", config.mode, config.timezone);
    if config.sudo.is_empty() {
        warn!("SUDO list is empty, no sender can run commands");
    }

    if let Err(e) = run(config).await {
        error!("fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);

    // The cache is required; an unreachable backend is fatal here and
    // fail-open everywhere after.
    let store = RedisStore::connect(&config.redis_uri).await?;
    store.init_legacy_flag().await?;
    info!("Connected to cache");

    let model = GeminiClient::new(config.gemini_api_key.clone());

    let (writer, writer_handle) = spawn_history_writer(HistoryStore::new(store.clone()));

    let gateway = GatewayClient::new(config.gateway_url.clone());
    if let Some(ref number) = config.pair_phone {
        gateway.pair_phone(number).await?;
    }
    let mut events = gateway.connect(&config.database_path).await?;
    info!("Gateway connected, waiting for messages");

    let handler = Arc::new(MessageHandler::new(
        config.clone(),
        model,
        gateway,
        OverrideStore::new(store.clone()),
        HistoryStore::new(store),
        writer,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = async {
            while let Some(event) = events.recv().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.handle(event).await;
                });
            }
        } => {
            warn!("Event stream closed");
        }
    }

    // Release the writer queue and let queued history writes drain.
    drop(events);
    drop(handler);
    match tokio::time::timeout(DRAIN_TIMEOUT, writer_handle).await {
        Ok(_) => info!("History writes drained, bye 👋"),
        Err(_) => warn!("Timed out draining history writes, dropping the rest"),
    }

    Ok(())
}
