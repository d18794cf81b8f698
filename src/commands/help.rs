use crate::discord::{Context, Error};

/// Show this help menu.
#[poise::command(slash_command, prefix_command, track_edits)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"] command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Daily quests reset 24 hours after creation.",
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}
