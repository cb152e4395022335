use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Команди:")]
pub enum Command {
    /// Відкрити меню
    Start,
}
