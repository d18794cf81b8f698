use poise::serenity_prelude as serenity;

use crate::discord::{Context, Error};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Explains what this bot is about.
#[poise::command(slash_command, prefix_command)]
pub async fn about(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title(format!("Guild RPG Bot v{}", VERSION))
        .description("Daily quests, gold and loot for your server.")
        .field(
            "Purpose of this bot",
            "Hand out daily quests and keep track of everyone's progress.",
            true,
        );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Prints the current status of the bot.
#[poise::command(slash_command, prefix_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let enabled = ctx.data().flag.read().await;

    let embed = serenity::CreateEmbed::new()
        .title("Bot Status")
        .field("Status", if enabled { "Online" } else { "Maintenance" }, true)
        .field("Version", VERSION, true)
        .field("Prefix", format!("`{}`", ctx.data().settings.prefix), true);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
