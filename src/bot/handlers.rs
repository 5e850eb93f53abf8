use crate::{
    bot::Command,
    registry::TOLERANCE,
    service::{reply_for_error, AlertService},
};
use std::sync::Arc;
use teloxide::{prelude::*, types::Message, utils::command::BotCommands};
use tracing::info;

pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

pub async fn handle_start(bot: Bot, msg: Message, check_interval: u64) -> ResponseResult<()> {
    let text = format!(
        "VWAP alert bot\n\n\
         Set a reference price for a token and get a message when the market \
         price comes within ±{:.0}% of it, at most once every 24 hours.\n\n\
         Prices are checked every {} seconds.\n\
         Use /help to see all commands.",
        TOLERANCE * 100.0,
        check_interval
    );
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn handle_set_alert(bot: Bot, msg: Message, service: Arc<AlertService>, args: String) -> ResponseResult<()> {
    let requested_by = msg.from().map(|user| user.full_name());
    info!("Comando /vwap en chat {}: {}", msg.chat.id, args);

    let reply = match service.set_alert(&args, msg.chat.id.0, requested_by).await {
        Ok(reply) => reply,
        Err(e) => reply_for_error(&e),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

pub async fn handle_list_alerts(bot: Bot, msg: Message, service: Arc<AlertService>) -> ResponseResult<()> {
    let reply = service.list_alerts().await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

pub async fn handle_remove_alert(bot: Bot, msg: Message, service: Arc<AlertService>, args: String) -> ResponseResult<()> {
    info!("Comando /remove_token en chat {}: {}", msg.chat.id, args);

    let reply = match service.remove_alert(&args).await {
        Ok(reply) => reply,
        Err(e) => reply_for_error(&e),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
