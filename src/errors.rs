use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("No hay alerta para {0}")]
    NotFound(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errores del proveedor de precios. Nunca modifican el estado de las alertas.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Error de conexión: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error de API: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Error al deserializar respuesta: {0}")]
    Decode(String),
    #[error("No se encontraron pares de trading para {0}")]
    NoPairs(String),
    #[error("Precio inválido para {token}: {raw}")]
    InvalidPrice { token: String, raw: String },
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("Error de Telegram: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error("No hay chat de destino para {0}")]
    NoTarget(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Error de E/S en el archivo de alertas: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archivo de alertas corrupto: {0}")]
    Json(#[from] serde_json::Error),
}
