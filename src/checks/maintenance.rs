use poise::serenity_prelude as serenity;

use crate::discord::{Context, Error};

/// Global check evaluated before every command. The toggle itself stays
/// reachable while maintenance is active, otherwise nobody could turn the
/// bot back on.
pub async fn maintenance(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.command().name == "maintenance" {
        return Ok(true);
    }
    if ctx.data().flag.read().await {
        return Ok(true);
    }

    let embed = serenity::CreateEmbed::new()
        .title("🔧 Maintenance")
        .description("The bot is under maintenance. Try again later.")
        .colour(serenity::Colour::RED);
    let _ = ctx.send(poise::CreateReply::default().embed(embed)).await;
    Ok(false)
}
