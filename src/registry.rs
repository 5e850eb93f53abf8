use crate::{
    errors::AlertError,
    models::{AlertEntry, AlertMeta, NotificationDecision, SuppressReason},
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Banda de tolerancia alrededor del nivel VWAP (±10%).
pub const TOLERANCE: f64 = 0.10;
pub const COOLDOWN_HOURS: i64 = 24;

pub type SharedRegistry = Arc<Mutex<AlertRegistry>>;

/// Tabla de alertas en memoria, en orden de inserción.
#[derive(Debug, Default)]
pub struct AlertRegistry {
    entries: Vec<AlertEntry>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Reconstruye el registro desde registros persistidos. Descarta umbrales
    /// inválidos y ids duplicados (gana el primero).
    pub fn from_entries(entries: Vec<AlertEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            if validate_threshold(entry.threshold).is_err() {
                warn!("Descartando alerta {} con umbral inválido {}", entry.token_id, entry.threshold);
                continue;
            }
            if registry.get(&entry.token_id).is_some() {
                warn!("Descartando alerta duplicada para {}", entry.token_id);
                continue;
            }
            registry.entries.push(entry);
        }
        registry
    }

    pub fn add(&mut self, token_id: &str, threshold: f64) -> Result<(), AlertError> {
        self.add_with_meta(token_id, threshold, AlertMeta::default())
    }

    /// Inserta o reemplaza. Al reemplazar se conserva `last_notified_at`.
    pub fn add_with_meta(&mut self, token_id: &str, threshold: f64, meta: AlertMeta) -> Result<(), AlertError> {
        validate_threshold(threshold)?;

        match self.position(token_id) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                debug!("Reemplazando umbral de {}: {} -> {}", token_id, entry.threshold, threshold);
                entry.threshold = threshold;
                entry.meta = meta;
            }
            None => {
                let mut entry = AlertEntry::new(token_id.to_string(), threshold);
                entry.meta = meta;
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, token_id: &str) -> bool {
        match self.position(token_id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn list(&self) -> &[AlertEntry] {
        &self.entries
    }

    pub fn get(&self, token_id: &str) -> Option<&AlertEntry> {
        self.entries.iter().find(|e| e.token_id == token_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evaluate(&self, token_id: &str, current_price: f64, now: DateTime<Utc>) -> NotificationDecision {
        let entry = match self.get(token_id) {
            Some(entry) => entry,
            None => return NotificationDecision::Suppressed(SuppressReason::NotWatched),
        };

        if !current_price.is_finite() || current_price <= 0.0 {
            return NotificationDecision::Suppressed(SuppressReason::InvalidPrice);
        }

        // Límites inclusivos calculados sobre el umbral, no sobre la desviación
        let lower = entry.threshold * (1.0 - TOLERANCE);
        let upper = entry.threshold * (1.0 + TOLERANCE);
        let deviation = (current_price - entry.threshold) / entry.threshold;
        if current_price < lower || current_price > upper {
            return NotificationDecision::Suppressed(SuppressReason::OutOfBand { deviation });
        }

        if let Some(last) = entry.last_notified_at {
            let cooldown = Duration::hours(COOLDOWN_HOURS);
            let elapsed = now - last;
            if elapsed < cooldown {
                return NotificationDecision::Suppressed(SuppressReason::Cooldown {
                    remaining: cooldown - elapsed,
                });
            }
        }

        NotificationDecision::Fire { deviation }
    }

    pub fn mark_notified(&mut self, token_id: &str, now: DateTime<Utc>) {
        if let Some(idx) = self.position(token_id) {
            let entry = &mut self.entries[idx];
            match entry.last_notified_at {
                Some(last) if now < last => {
                    warn!("Ignorando marca de notificación anterior a la última para {}", token_id);
                }
                _ => entry.last_notified_at = Some(now),
            }
        }
    }

    fn position(&self, token_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.token_id == token_id)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), AlertError> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(AlertError::InvalidInput(threshold.to_string()))
    }
}
