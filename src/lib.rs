pub mod bot;
pub mod clock;
pub mod config;
pub mod crypto_api;
pub mod errors;
pub mod format;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod registry;
pub mod service;
pub mod store;
pub mod timer;

#[cfg(test)]
mod testing;

pub use crate::config::AppConfig;
pub use crate::errors::{AlertError, FetchError, SendError, StoreError};
pub use crate::models::*;
pub use crate::registry::{AlertRegistry, SharedRegistry};

use crate::{
    bot::TelegramBot,
    clock::{Clock, SystemClock},
    crypto_api::{DexScreenerClient, PriceProvider},
    monitor::{MonitorSettings, PriceMonitor},
    notify::NotificationService,
    service::AlertService,
    store::AlertStore,
};
use std::error::Error;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info};

/// Carga las alertas guardadas, arranca el monitor en segundo plano y atiende
/// comandos de Telegram hasta recibir Ctrl-C.
pub async fn run(config: AppConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = config.alerts_file.clone().map(AlertStore::new);
    let registry = match &store {
        Some(store) => AlertRegistry::from_entries(store.load_or_recover().await?),
        None => AlertRegistry::new(),
    };
    info!("{} alertas cargadas", registry.len());
    let registry = registry.shared();

    let bot = Bot::new(config.telegram_token.clone());
    let notification_service = NotificationService::new(bot.clone());
    if let Err(e) = notification_service.verify_bot().await {
        error!("Error al verificar el bot de Telegram: {}", e);
        return Err(e.into());
    }

    let provider: Arc<dyn PriceProvider> = Arc::new(DexScreenerClient::new(config.dexscreener_url.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let monitor = PriceMonitor::new(
        registry.clone(),
        provider.clone(),
        Arc::new(notification_service),
        clock.clone(),
        MonitorSettings {
            check_interval: config.check_interval,
            alert_chat_id: config.alert_chat_id,
            mention: config.alert_mention.clone(),
        },
    )
    .with_store(store.clone());

    let service = Arc::new(AlertService::new(registry, provider, clock, store));
    let telegram_bot = TelegramBot::new(bot, service, config.check_interval);

    let monitor_handle = tokio::spawn(async move { monitor.start().await });

    info!("Bot en marcha, esperando comandos...");
    telegram_bot.run().await;

    monitor_handle.abort();
    info!("Bot detenido");
    Ok(())
}
