use crate::errors::SendError;
use async_trait::async_trait;
use teloxide::{prelude::*, types::{ChatId, ParseMode}, Bot};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError>;
}

const VERIFY_ATTEMPTS: u32 = 3;
const VERIFY_BASE_DELAY: Duration = Duration::from_secs(5);
/// Tope de espera entre intentos, en múltiplos del retardo base.
const VERIFY_MAX_FACTOR: u32 = 6;

pub struct NotificationService {
    bot: Bot,
    verify_delay: Duration,
}

impl NotificationService {
    pub fn new(bot: Bot) -> Self {
        info!("Inicializando NotificationService");
        Self {
            bot,
            verify_delay: VERIFY_BASE_DELAY,
        }
    }

    /// Comprueba el token con `getMe` antes de aceptar comandos. Los fallos se
    /// reintentan con espera exponencial; el último error se devuelve tal cual.
    pub async fn verify_bot(&self) -> Result<(), SendError> {
        let mut attempt = 1;
        loop {
            match self.bot.get_me().await {
                Ok(me) => {
                    info!("Bot verificado: @{}", me.username());
                    return Ok(());
                }
                Err(e) if attempt >= VERIFY_ATTEMPTS => {
                    error!("No se pudo verificar el bot tras {} intentos: {}", attempt, e);
                    return Err(e.into());
                }
                Err(e) => {
                    let delay = backoff_delay(self.verify_delay, attempt);
                    warn!(
                        "Fallo al verificar el bot (intento {}/{}): {}. Nuevo intento en {:?}",
                        attempt, VERIFY_ATTEMPTS, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Espera antes del intento `attempt + 1`: base, 2×base, 4×base... con tope.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1)).min(VERIFY_MAX_FACTOR);
    base * factor
}

#[async_trait]
impl MessageSink for NotificationService {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        debug!("Enviando notificación a chat_id {}: {}", chat_id, text);

        self.bot
            .send_message(ChatId(chat_id), escape_markdown(text))
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        Ok(())
    }
}

/// Escapa el texto plano para MarkdownV2.
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '<', '#', '+', '-', '=', '|', '{', '}',
        '.', '!', '$', '%',
    ];

    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
