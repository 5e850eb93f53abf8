mod commands;
mod handlers;

pub use commands::Command;
use handlers::*;

use crate::service::AlertService;
use std::sync::Arc;
use teloxide::{
    dispatching::{HandlerExt, UpdateHandler},
    prelude::*,
    RequestError,
};

pub struct TelegramBot {
    bot: Bot,
    handler: UpdateHandler<RequestError>,
}

impl TelegramBot {
    pub fn new(bot: Bot, service: Arc<AlertService>, check_interval: u64) -> Self {
        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let service = service.clone();
                        async move {
                            match cmd {
                                Command::Help => handle_help(bot, msg).await,
                                Command::Start => handle_start(bot, msg, check_interval).await,
                                Command::Vwap(args) => handle_set_alert(bot, msg, service, args).await,
                                Command::ListAlerts => handle_list_alerts(bot, msg, service).await,
                                Command::RemoveToken(args) => handle_remove_alert(bot, msg, service, args).await,
                            }
                        }
                    }),
            );

        Self { bot, handler }
    }

    pub async fn run(&self) {
        Dispatcher::builder(self.bot.clone(), self.handler.clone())
            .default_handler(|upd| async move {
                log::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "Error al procesar actualización"
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}
