use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(
    rename_rule = "snake_case",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "show this message")]
    Help,
    #[command(description = "start the bot")]
    Start,
    #[command(description = "watch a token - /vwap <contract_address> <vwap_level>")]
    Vwap(String),
    #[command(description = "list the current alerts")]
    ListAlerts,
    #[command(description = "stop watching a token - /remove_token <contract_address>")]
    RemoveToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("/vwap 0xabc 1.25", "vwapbot").unwrap(),
            Command::Vwap("0xabc 1.25".to_string())
        );
        assert_eq!(Command::parse("/list_alerts", "vwapbot").unwrap(), Command::ListAlerts);
        assert_eq!(
            Command::parse("/remove_token 0xabc", "vwapbot").unwrap(),
            Command::RemoveToken("0xabc".to_string())
        );
        assert!(Command::parse("/unknown", "vwapbot").is_err());
    }

    #[test]
    fn test_parse_commands_without_arguments() {
        assert_eq!(Command::parse("/vwap", "vwapbot").unwrap(), Command::Vwap(String::new()));
        assert_eq!(
            Command::parse("/remove_token", "vwapbot").unwrap(),
            Command::RemoveToken(String::new())
        );
    }
}
