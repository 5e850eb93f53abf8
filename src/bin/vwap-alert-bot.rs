use tracing_subscriber::EnvFilter;
use vwap_alert_bot::{run, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Iniciando bot de alertas VWAP...");

    let config = AppConfig::new()?;
    run(config).await
}
