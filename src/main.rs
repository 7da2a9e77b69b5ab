//! MA Touch Alert Bot - Entry Point
//!
//! This binary:
//! 1. Loads configuration (.env credentials + optional config.yaml)
//! 2. Builds the configured market-data provider and the Telegram channel
//! 3. Spawns the polling loop and the operator command listener
//! 4. Waits for Ctrl+C and shuts both tasks down gracefully

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use ma_touch_bot::config::{self, constants, BotConfig, ProviderKind};
use ma_touch_bot::core::audit::AuditLog;
use ma_touch_bot::core::cache::MaCache;
use ma_touch_bot::core::scheduler::polling_task;
use ma_touch_bot::messaging::commands::command_task;
use ma_touch_bot::messaging::telegram::{TelegramChannel, TelegramConfig};
use ma_touch_bot::messaging::traits::Messenger;
use ma_touch_bot::provider::coingecko::CoinGeckoProvider;
use ma_touch_bot::provider::rate_limit::RateBudget;
use ma_touch_bot::provider::traits::MarketDataProvider;

/// Default bot configuration file
const CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();

    // Initialize logging
    config::init_logging();

    info!("🚀 MA touch alert bot starting...");
    constants::log_configuration();

    // Load bot configuration; credentials are fatal, config.yaml is optional
    let bot_config = if Path::new(CONFIG_PATH).exists() {
        match config::load_config(Path::new(CONFIG_PATH)) {
            Ok(cfg) => {
                info!(
                    windows = ?cfg.windows,
                    top_n = cfg.universe.top_n,
                    "[CONFIG] Loaded {}", CONFIG_PATH
                );
                cfg
            }
            Err(e) => {
                error!("[ERROR] Configuration failed: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("[CONFIG] {} not found, using built-in defaults", CONFIG_PATH);
        BotConfig::default()
    };

    let telegram_config = match TelegramConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("[ERROR] {}", e);
            std::process::exit(1);
        }
    };

    // Build the messaging channel and the configured provider
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramChannel::new(telegram_config));
    let provider: Arc<dyn MarketDataProvider> = match bot_config.provider {
        ProviderKind::Coingecko => Arc::new(CoinGeckoProvider::new(
            std::env::var("COINGECKO_API_KEY").ok(),
            RateBudget::new(constants::rate_budget_per_min()),
        )),
    };
    info!(provider = provider.name(), "market-data provider ready");

    let cache = Arc::new(MaCache::new(constants::cache_ttl()));
    let audit = Arc::new(AuditLog::new(
        constants::audit_log_path(),
        constants::audit_max_bytes(),
        constants::audit_max_backups(),
    ));
    let shared_config = bot_config.alerts.clone().into_shared();

    // Create shutdown broadcast channel
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    // Spawn SIGINT handler task
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("[SHUTDOWN] Graceful shutdown initiated");
                let _ = shutdown_signal.send(());
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C signal: {}", err);
            }
        }
    });

    let polling_handle = tokio::spawn(polling_task(
        provider,
        messenger.clone(),
        shared_config.clone(),
        bot_config,
        cache,
        audit.clone(),
        shutdown_tx.subscribe(),
    ));
    let command_handle = tokio::spawn(command_task(
        messenger,
        shared_config,
        audit,
        shutdown_tx.subscribe(),
    ));

    info!("Bot is running. Press Ctrl+C to stop.");

    let _ = shutdown_rx.recv().await;
    info!("[SHUTDOWN] Shutdown signal received in main task");

    let _ = polling_handle.await;
    let _ = command_handle.await;

    info!("[SHUTDOWN] Clean exit");
    Ok(())
}
