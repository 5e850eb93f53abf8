use dotenv::dotenv;
use std::env;
use std::error::Error;
use std::path::PathBuf;

pub const DEFAULT_CHECK_INTERVAL: u64 = 60;
pub const DEFAULT_ALERTS_FILE: &str = "alerts.json";
pub const DEFAULT_DEXSCREENER_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    pub check_interval: u64,
    pub alert_chat_id: Option<i64>,
    pub alert_mention: Option<String>,
    pub alerts_file: Option<PathBuf>,
    pub dexscreener_url: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, Box<dyn Error + Send + Sync>> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or("Falta la variable TELEGRAM_BOT_TOKEN")?;

        let check_interval = match lookup("CHECK_INTERVAL") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse()
                    .map_err(|e| format!("CHECK_INTERVAL inválido '{}': {}", raw, e))?;
                if secs == 0 {
                    return Err("CHECK_INTERVAL debe ser mayor que 0".into());
                }
                secs
            }
            None => DEFAULT_CHECK_INTERVAL,
        };

        let alert_chat_id = match lookup("ALERT_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(raw.trim().parse::<i64>()
                .map_err(|e| format!("ALERT_CHAT_ID inválido '{}': {}", raw, e))?),
            None => None,
        };

        // Un ALERTS_FILE vacío desactiva la persistencia
        let alerts_file = match lookup("ALERTS_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_ALERTS_FILE)),
        };

        Ok(Self {
            telegram_token,
            check_interval,
            alert_chat_id,
            alert_mention: lookup("ALERT_MENTION").filter(|m| !m.trim().is_empty()),
            alerts_file,
            dexscreener_url: lookup("DEXSCREENER_API_URL")
                .unwrap_or_else(|| DEFAULT_DEXSCREENER_URL.to_string()),
        })
    }
}
