use crate::{
    clock::Clock,
    crypto_api::PriceProvider,
    errors::{FetchError, SendError},
    format::format_price,
    models::{AlertEntry, NotificationDecision, TickReport, TokenQuote},
    notify::MessageSink,
    registry::SharedRegistry,
    store::AlertStore,
    timer::Timer,
};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Consultas de precio simultáneas por tick.
pub const MAX_CONCURRENT_FETCHES: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct MonitorSettings {
    pub check_interval: u64,
    /// Si está definido, todas las notificaciones van a este chat.
    pub alert_chat_id: Option<i64>,
    pub mention: Option<String>,
}

pub struct PriceMonitor {
    registry: SharedRegistry,
    provider: Arc<dyn PriceProvider>,
    sink: Arc<dyn MessageSink>,
    clock: Arc<dyn Clock>,
    store: Option<AlertStore>,
    settings: MonitorSettings,
}

impl PriceMonitor {
    pub fn new(
        registry: SharedRegistry,
        provider: Arc<dyn PriceProvider>,
        sink: Arc<dyn MessageSink>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            registry,
            provider,
            sink,
            clock,
            store: None,
            settings,
        }
    }

    pub fn with_store(mut self, store: Option<AlertStore>) -> Self {
        self.store = store;
        self
    }

    pub async fn start(&self) {
        info!("Iniciando monitor de precios cada {} segundos...", self.settings.check_interval);

        let timer = Timer::new(self.settings.check_interval);
        timer.start(move || async move {
            let report = self.tick().await;
            info!(
                "Tick completado: {} revisados, {} notificados, {} suprimidos, {} errores de precio, {} errores de envío",
                report.checked, report.fired, report.suppressed, report.fetch_failures, report.send_failures
            );
        }).await;
    }

    pub async fn tick(&self) -> TickReport {
        self.tick_at(self.clock.now()).await
    }

    /// Una pasada completa sobre las alertas registradas usando `now` como hora actual.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let watched: Vec<String> = {
            let registry = self.registry.lock().await;
            registry.list().iter().map(|e| e.token_id.clone()).collect()
        };

        let mut report = TickReport::default();
        if watched.is_empty() {
            debug!("No hay alertas activas");
            return report;
        }
        info!("Verificando {} alertas activas...", watched.len());

        let provider = &self.provider;
        let quotes: Vec<(String, Result<TokenQuote, FetchError>)> = stream::iter(watched)
            .map(|token_id| async move {
                let result = provider.get_quote(&token_id).await;
                (token_id, result)
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        for (token_id, result) in quotes {
            let quote = match result {
                Ok(quote) => quote,
                Err(e) => {
                    warn!("Sin datos para {}, se reintentará en el próximo tick: {}", token_id, e);
                    report.fetch_failures += 1;
                    continue;
                }
            };
            report.checked += 1;
            info!("Precio de {}: ${}", quote.symbol, quote.price_usd);

            let (decision, entry) = {
                let registry = self.registry.lock().await;
                let decision = registry.evaluate(&token_id, quote.price_usd, now);
                (decision, registry.get(&token_id).cloned())
            };

            let (deviation, entry) = match (decision, entry) {
                (NotificationDecision::Fire { deviation }, Some(entry)) => (deviation, entry),
                (decision, _) => {
                    if let NotificationDecision::Suppressed(reason) = decision {
                        debug!("Alerta de {} suprimida: {}", token_id, reason);
                    }
                    report.suppressed += 1;
                    continue;
                }
            };

            let text = self.notification_text(&entry, &quote, deviation);
            match self.deliver(&entry, &text).await {
                Ok(()) => {
                    info!("Notificación enviada para {} ({})", entry.display_name(), token_id);
                    let mut registry = self.registry.lock().await;
                    registry.mark_notified(&token_id, now);
                    self.persist(registry.list()).await;
                    report.fired += 1;
                }
                Err(e) => {
                    // Sin marcar: el siguiente tick elegible vuelve a intentarlo
                    error!("Error al enviar notificación para {}: {}", token_id, e);
                    report.send_failures += 1;
                }
            }
        }

        report
    }

    async fn deliver(&self, entry: &AlertEntry, text: &str) -> Result<(), SendError> {
        let chat_id = self.settings.alert_chat_id
            .or(entry.meta.chat_id)
            .ok_or_else(|| SendError::NoTarget(entry.token_id.clone()))?;
        self.sink.send(chat_id, text).await
    }

    fn notification_text(&self, entry: &AlertEntry, quote: &TokenQuote, deviation: f64) -> String {
        let ticker = entry.meta.ticker.as_deref().unwrap_or(&quote.symbol);
        let mut text = String::new();
        if let Some(mention) = &self.settings.mention {
            text.push_str(mention);
            text.push('\n');
        }
        text.push_str(&format!(
            "{} is near the VWAP!\n\nCurrent price: {} ({:+.2}%)\nVWAP level: {}",
            ticker,
            format_price(quote.price_usd),
            deviation * 100.0,
            format_price(entry.threshold),
        ));
        if let Some(user) = &entry.meta.requested_by {
            text.push_str(&format!("\nSet by: {}", user));
        }
        text
    }

    async fn persist(&self, entries: &[AlertEntry]) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(entries).await {
                error!("Error al guardar alertas en {}: {}", store.path().display(), e);
            }
        }
    }
}
