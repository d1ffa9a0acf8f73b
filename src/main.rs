use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use solana_outflow_monitor::blockchain::{BlockMonitor, OutflowDetector, ProviderAccess, RpcClient};
use solana_outflow_monitor::config::AppConfig;
use solana_outflow_monitor::logging;
use solana_outflow_monitor::notify::{LogNotifier, NotificationSink, TelegramNotifier};
use solana_outflow_monitor::watermark::WatermarkStore;

#[derive(Parser)]
#[command(name = "solana-outflow-monitor")]
#[command(about = "Watches a wallet watch-list for outgoing SOL transfers in configured amount ranges")]
#[command(version = "0.1.0")]
struct Args {
    /// Configuration file path
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal configuration error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init(&config.logging);

    let wallets = config.watched_wallets();
    if wallets.is_empty() {
        warn!("watch-list is empty; the monitor will track the chain but never alert");
    }
    info!(
        "monitoring {} wallet(s) via {}{}",
        wallets.len(),
        config.provider.primary_url,
        if config.provider.secondary_url.is_some() {
            " (secondary configured)"
        } else {
            ""
        }
    );

    let primary = RpcClient::new(
        config.provider.primary_url.clone(),
        config.provider.commitment.clone(),
        config.provider.timeout_seconds,
    );
    let secondary = config.provider.secondary_url.clone().map(|url| {
        RpcClient::new(
            url,
            config.provider.commitment.clone(),
            config.provider.timeout_seconds,
        )
    });
    let provider = ProviderAccess::new(primary, secondary);

    let sink: Arc<dyn NotificationSink> = match &config.telegram {
        Some(telegram) => {
            info!("telegram notifications enabled for chat {}", telegram.chat_id);
            Arc::new(TelegramNotifier::new(
                telegram.bot_token.clone(),
                telegram.chat_id.clone(),
            ))
        }
        None => {
            info!("no telegram bot configured, alerts go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let store = WatermarkStore::new(&config.watermark.path);
    let detector = OutflowDetector::new(wallets);
    let mut monitor = BlockMonitor::new(
        provider,
        sink,
        detector,
        store,
        Some(config.monitor.to_monitor_config()),
    );

    let shutdown = monitor.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received shutdown signal");
                shutdown.store(true, Ordering::Relaxed);
            }
            Err(e) => error!("unable to listen for shutdown signal: {}", e),
        }
    });

    match monitor.run().await {
        Ok(()) => info!("monitor stopped at watermark {}", monitor.watermark()),
        Err(e) => {
            error!("monitor failed: {}", e);
            std::process::exit(1);
        }
    }
}
