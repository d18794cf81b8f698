use poise::serenity_prelude as serenity;
use poise::ChoiceParameter;

use crate::discord::{Context, Error};

#[derive(Clone, Copy, Debug, ChoiceParameter)]
pub enum MaintenanceMode {
    #[name = "on"]
    On,
    #[name = "off"]
    Off,
}

/// Toggle maintenance mode. `on` blocks every command until turned off.
#[poise::command(slash_command, prefix_command, check = "crate::checks::admin")]
pub async fn maintenance(
    ctx: Context<'_>,
    #[description = "on or off"] mode: MaintenanceMode,
) -> Result<(), Error> {
    // Maintenance "on" means the shared flag reads disabled.
    let enabled = matches!(mode, MaintenanceMode::Off);
    ctx.data().flag.write(enabled).await;
    log::info!("Maintenance set to '{}' by {}", mode.name(), ctx.author().tag());

    ctx.say(format!("✅ Maintenance set to `{}`", mode.name()))
        .await?;
    Ok(())
}

/// Manage admins which are able to toggle maintenance.
#[poise::command(
    slash_command,
    prefix_command,
    owners_only,
    subcommands("add", "remove", "list")
)]
pub async fn admin(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Check `help admin` to view all available subcommands.")
        .await?;
    Ok(())
}

/// Add an admin.
#[poise::command(slash_command, prefix_command, owners_only)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Who to add"] user: serenity::User,
) -> Result<(), Error> {
    ctx.data()
        .state
        .lock()
        .await
        .add_admin(user.id.get())
        .await?;
    ctx.say(format!("Added '{}' to the admins list.", user.tag()))
        .await?;
    Ok(())
}

/// Remove an admin.
#[poise::command(slash_command, prefix_command, owners_only, aliases("rm"))]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Who to remove"] user: serenity::User,
) -> Result<(), Error> {
    ctx.data()
        .state
        .lock()
        .await
        .remove_admin(user.id.get())
        .await?;
    ctx.say(format!("Removed '{}' from the admins list.", user.tag()))
        .await?;
    Ok(())
}

/// List all admins.
#[poise::command(slash_command, prefix_command, owners_only, aliases("ls"))]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let state = ctx.data().state.lock().await;

    let mut response = String::from("**Admins:**\n");
    if state.admins().is_empty() {
        response.push_str("*No Admins found.*");
    } else {
        for admin in state.admins() {
            response.push_str(&format!("<@{}> ({})\n", admin, admin));
        }
    }
    drop(state);

    ctx.say(response).await?;
    Ok(())
}

/// Shutdown the bot.
#[poise::command(prefix_command, owners_only)]
pub async fn quit(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Shutting down!").await?;
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}
