use crate::{errors::StoreError, models::AlertEntry};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Persistencia de las alertas en un archivo JSON.
#[derive(Debug, Clone)]
pub struct AlertStore {
    path: PathBuf,
}

impl AlertStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Un archivo inexistente equivale a no tener alertas.
    pub async fn load(&self) -> Result<Vec<AlertEntry>, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No existe {}, iniciando sin alertas", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<AlertEntry> = serde_json::from_str(&raw)?;
        info!("Cargadas {} alertas desde {}", entries.len(), self.path.display());
        Ok(entries)
    }

    /// Como `load`, pero un JSON corrupto no impide arrancar: se aparta a
    /// `<archivo>.json.corrupt` y se empieza sin alertas.
    pub async fn load_or_recover(&self) -> Result<Vec<AlertEntry>, StoreError> {
        match self.load().await {
            Err(StoreError::Json(e)) => {
                let backup = self.path.with_extension("json.corrupt");
                warn!(
                    "Archivo de alertas {} corrupto ({}), se mueve a {} y se inicia sin alertas",
                    self.path.display(),
                    e,
                    backup.display()
                );
                fs::rename(&self.path, &backup).await?;
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Escribe a un archivo temporal y lo renombra para no dejar el JSON a medias.
    pub async fn save(&self, entries: &[AlertEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Guardadas {} alertas en {}", entries.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vwap-alert-bot-{}-{}", std::process::id(), name))
            .join("alerts.json")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let store = AlertStore::new(temp_path("missing"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let store = AlertStore::new(&path);

        let mut entry = AlertEntry::new("0xabc".to_string(), 0.0042);
        entry.last_notified_at = Some(Utc.with_ymd_and_hms(2024, 11, 4, 12, 0, 0).unwrap());
        entry.meta.ticker = Some("PEPE".to_string());
        entry.meta.chat_id = Some(-100123);
        let entries = vec![entry, AlertEntry::new("0xdef".to_string(), 50.0)];

        store.save(&entries).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, entries);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_accepts_records_without_optional_fields() {
        let path = temp_path("minimal");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"[{"token_id":"0xabc","threshold":1.5}]"#).unwrap();

        let loaded = AlertStore::new(&path).load().await.unwrap();
        assert_eq!(loaded, vec![AlertEntry::new("0xabc".to_string(), 1.5)]);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(AlertStore::new(&path).load().await, Err(StoreError::Json(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_moved_aside_on_recover() {
        let path = temp_path("recover");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let store = AlertStore::new(&path);
        assert!(store.load_or_recover().await.unwrap().is_empty());

        let backup = path.with_extension("json.corrupt");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");
        assert!(!path.exists());

        // El siguiente guardado crea un archivo nuevo y válido
        store.save(&[AlertEntry::new("0xabc".to_string(), 2.0)]).await.unwrap();
        assert_eq!(store.load_or_recover().await.unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
