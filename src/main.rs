//! aviser-bot: binary entrypoint.
//! Loads config, wires the Telegram client, file storage and consumer loop,
//! then polls until Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use aviser_bot::clients::telegram::TelegramClient;
use aviser_bot::config::BotConfig;
use aviser_bot::events::telegram::{TelegramProcessor, TelegramSource};
use aviser_bot::storage::files::FileStorage;
use aviser_bot::{metrics::Metrics, telemetry, Consumer};

#[derive(Debug, Parser)]
#[command(name = "aviser-bot", version, about = "Keeps links for you and hands them back at random")]
struct Cli {
    /// Token for access to the Telegram bot.
    #[arg(long = "tg-bot-token", env = "TG_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// TOML config file (else $BOT_CONFIG_PATH, else config/bot.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the storage directory.
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Override the number of updates fetched per cycle.
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if cli.token.trim().is_empty() {
        bail!("token is not specified");
    }

    let mut cfg = BotConfig::load(cli.config.as_deref())?;
    if let Some(p) = cli.storage_path {
        cfg.storage_path = p;
    }
    if let Some(n) = cli.batch_size {
        cfg.batch_size = n.clamp(1, 100);
    }

    telemetry::init_tracing(cfg.log_format);

    if let Some(addr) = cfg.metrics_addr {
        let metrics = Metrics::init()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics listener on {addr}"))?;
        let router = metrics.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "metrics server stopped");
            }
        });
        tracing::info!(%addr, "metrics endpoint enabled");
    }

    let tg = TelegramClient::new(&cfg.host, cli.token.trim(), cfg.request_timeout())?;
    let source = TelegramSource::new(tg.clone());
    let processor = TelegramProcessor::new(tg, FileStorage::new(&cfg.storage_path));

    tracing::info!(
        host = %cfg.host,
        storage = %cfg.storage_path.display(),
        "service started"
    );

    let mut consumer = Consumer::new(source, processor, cfg.consumer_cfg());
    consumer
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "can't listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("service is stopped");
    Ok(())
}
