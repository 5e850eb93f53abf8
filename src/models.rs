use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Datos de contexto de una alerta, sin efecto en la decisión de notificar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertMeta {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub requested_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub token_id: String,
    pub threshold: f64,
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: AlertMeta,
}

impl AlertEntry {
    pub fn new(token_id: String, threshold: f64) -> Self {
        Self {
            token_id,
            threshold,
            last_notified_at: None,
            meta: AlertMeta::default(),
        }
    }

    /// Ticker si se conoce, si no la dirección del contrato.
    pub fn display_name(&self) -> &str {
        self.meta.ticker.as_deref().unwrap_or(&self.token_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuppressReason {
    NotWatched,
    InvalidPrice,
    OutOfBand { deviation: f64 },
    Cooldown { remaining: Duration },
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuppressReason::NotWatched => write!(f, "token no vigilado"),
            SuppressReason::InvalidPrice => write!(f, "precio inválido"),
            SuppressReason::OutOfBand { deviation } => {
                write!(f, "fuera de banda ({:+.2}%)", deviation * 100.0)
            }
            SuppressReason::Cooldown { remaining } => {
                write!(f, "en espera ({} min restantes)", remaining.num_minutes())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationDecision {
    /// `deviation` es la distancia relativa con signo respecto al umbral.
    Fire { deviation: f64 },
    Suppressed(SuppressReason),
}

impl NotificationDecision {
    pub fn is_fire(&self) -> bool {
        matches!(self, NotificationDecision::Fire { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenQuote {
    pub token_id: String,
    pub symbol: String,
    pub quote_symbol: String,
    pub price_usd: f64,
    pub liquidity_usd: Option<f64>,
    pub fdv: Option<f64>,
    pub volume_24h: Option<f64>,
    pub chain_id: String,
    pub dex_id: String,
    pub url: Option<String>,
    pub pair_created_at: Option<DateTime<Utc>>,
}

impl TokenQuote {
    pub fn age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.pair_created_at.map(|created| (now - created).num_days())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub fired: usize,
    pub suppressed: usize,
    pub fetch_failures: usize,
    pub send_failures: usize,
}
