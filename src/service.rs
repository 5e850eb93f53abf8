use crate::{
    clock::Clock,
    crypto_api::PriceProvider,
    errors::{AlertError, FetchError},
    format::{format_price, format_timestamp, format_usd_compact},
    models::{AlertEntry, AlertMeta, TokenQuote},
    registry::{validate_threshold, SharedRegistry, TOLERANCE},
    store::AlertStore,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Lógica de los comandos del bot, independiente de Telegram.
pub struct AlertService {
    registry: SharedRegistry,
    provider: Arc<dyn PriceProvider>,
    clock: Arc<dyn Clock>,
    store: Option<AlertStore>,
}

impl AlertService {
    pub fn new(
        registry: SharedRegistry,
        provider: Arc<dyn PriceProvider>,
        clock: Arc<dyn Clock>,
        store: Option<AlertStore>,
    ) -> Self {
        Self { registry, provider, clock, store }
    }

    /// `/vwap <contrato> <nivel>`
    pub async fn set_alert(
        &self,
        args: &str,
        chat_id: i64,
        requested_by: Option<String>,
    ) -> Result<String, AlertError> {
        let (token_id, threshold) = parse_set_alert_args(args)?;

        let quote = match self.provider.get_quote(&token_id).await {
            Ok(quote) => Some(quote),
            Err(e @ FetchError::NoPairs(_)) => return Err(e.into()),
            Err(e) => {
                warn!("No se pudo obtener el precio de {} al crear la alerta: {}", token_id, e);
                None
            }
        };

        {
            let mut registry = self.registry.lock().await;
            let ticker = quote
                .as_ref()
                .map(|q| q.symbol.clone())
                .or_else(|| registry.get(&token_id).and_then(|e| e.meta.ticker.clone()));
            let meta = AlertMeta {
                ticker,
                chat_id: Some(chat_id),
                requested_by: requested_by.clone(),
            };
            registry.add_with_meta(&token_id, threshold, meta)?;
            self.persist(registry.list()).await;
        }

        info!(
            "Alerta creada para {} en ${} por {}",
            token_id,
            threshold,
            requested_by.as_deref().unwrap_or("desconocido")
        );

        Ok(self.set_alert_reply(&token_id, threshold, quote.as_ref()))
    }

    /// `/list_alerts`
    pub async fn list_alerts(&self) -> String {
        let registry = self.registry.lock().await;
        if registry.is_empty() {
            return "No alerts are currently set.".to_string();
        }

        let lines: Vec<String> = registry
            .list()
            .iter()
            .map(|entry| {
                let name = match &entry.meta.ticker {
                    Some(ticker) => format!("{} {}", ticker, entry.token_id),
                    None => entry.token_id.clone(),
                };
                format!(
                    "{} (VWAP: {}, Last Alert: {})",
                    name,
                    format_price(entry.threshold),
                    format_timestamp(entry.last_notified_at),
                )
            })
            .collect();

        format!("Current Alerts:\n{}", lines.join("\n"))
    }

    /// `/remove_token <contrato>`. Borrar algo que no existe no es un error
    /// del bot: se informa como `NotFound` y el registro no cambia.
    pub async fn remove_alert(&self, args: &str) -> Result<String, AlertError> {
        let token_id = match args.split_whitespace().collect::<Vec<_>>().as_slice() {
            [token] => normalize_token_id(token),
            _ => return Err(AlertError::InvalidInput("usage: /remove_token <contract_address>".to_string())),
        };

        let mut registry = self.registry.lock().await;
        if !registry.remove(&token_id) {
            return Err(AlertError::NotFound(token_id));
        }
        self.persist(registry.list()).await;
        info!("Alerta eliminada para {}", token_id);

        Ok(format!("Alert for contract {} has been removed.", token_id))
    }

    fn set_alert_reply(&self, token_id: &str, threshold: f64, quote: Option<&TokenQuote>) -> String {
        let mut reply = String::new();

        match quote {
            Some(q) => {
                reply.push_str(&format!("{} / {}\n", q.symbol, q.quote_symbol));
                reply.push_str(&format!("Contract: {}\n", token_id));
                reply.push_str(&format!("Chain: {} @ {}\n", q.chain_id, q.dex_id));
                reply.push_str(&format!("USD Price: {}\n", format_price(q.price_usd)));
                if let Some(liquidity) = q.liquidity_usd {
                    reply.push_str(&format!("Liquidity: {}\n", format_usd_compact(liquidity)));
                }
                if let Some(fdv) = q.fdv {
                    reply.push_str(&format!("FDV: {}\n", format_usd_compact(fdv)));
                }
                if let Some(volume) = q.volume_24h {
                    reply.push_str(&format!("Volume (24h): {}\n", format_usd_compact(volume)));
                }
                if let Some(age) = q.age_days(self.clock.now()) {
                    reply.push_str(&format!("Age: {}d\n", age));
                }
            }
            None => {
                reply.push_str(&format!("Contract: {}\n", token_id));
                reply.push_str("USD Price: currently unavailable\n");
            }
        }

        reply.push_str(&format!(
            "Alert set: Notify when price is within ±{:.0}% of VWAP level {}",
            TOLERANCE * 100.0,
            format_price(threshold)
        ));
        reply
    }

    async fn persist(&self, entries: &[AlertEntry]) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(entries).await {
                error!("Error al guardar alertas en {}: {}", store.path().display(), e);
            }
        }
    }
}

/// Las direcciones de contrato se comparan en minúsculas.
pub fn normalize_token_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn parse_set_alert_args(args: &str) -> Result<(String, f64), AlertError> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let (token, raw_level) = match parts.as_slice() {
        [token, level] => (*token, *level),
        _ => {
            return Err(AlertError::InvalidInput(
                "usage: /vwap <contract_address> <vwap_level>".to_string(),
            ))
        }
    };

    let cleaned = raw_level.trim_start_matches('$').replace(',', "");
    let threshold: f64 = cleaned
        .parse()
        .map_err(|_| AlertError::InvalidInput(format!("invalid threshold '{}'", raw_level)))?;
    validate_threshold(threshold)
        .map_err(|_| AlertError::InvalidInput(format!("invalid threshold '{}'", raw_level)))?;

    Ok((normalize_token_id(token), threshold))
}

/// Respuesta para el chat cuando un comando no se pudo completar.
pub fn reply_for_error(err: &AlertError) -> String {
    match err {
        AlertError::InvalidInput(msg) => format!("❌ {}", msg),
        AlertError::NotFound(token_id) => format!("No alert found for contract {}.", token_id),
        AlertError::Fetch(FetchError::NoPairs(token_id)) => format!(
            "No trading pairs found for contract {}. Please verify the address.",
            token_id
        ),
        AlertError::Fetch(e) => {
            error!("Error del proveedor de precios: {}", e);
            "❌ Price data is currently unavailable, try again later.".to_string()
        }
    }
}
