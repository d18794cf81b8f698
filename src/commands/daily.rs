use anyhow::Context as _;
use poise::serenity_prelude as serenity;

use crate::daily::{DailyQuest, GrantedRewards, ProgressReport};
use crate::discord::{Context, Error};

fn caller(ctx: &Context<'_>) -> Result<(u64, u64), Error> {
    let guild = ctx
        .guild_id()
        .context("This command only works in a server.")?;
    Ok((guild.get(), ctx.author().id.get()))
}

fn reward_line(quest: &DailyQuest) -> String {
    let mut rewards = Vec::new();
    if quest.reward_gold > 0 {
        rewards.push(format!("{} gold", quest.reward_gold));
    }
    if quest.reward_xp > 0 {
        rewards.push(format!("{} XP", quest.reward_xp));
    }
    if let Some(item) = &quest.reward_item {
        rewards.push(item.clone());
    }
    if rewards.is_empty() {
        "(none)".to_string()
    } else {
        rewards.join(", ")
    }
}

fn granted_line(rewards: &GrantedRewards) -> String {
    let mut parts = Vec::new();
    if let Some(gold) = rewards.gold {
        parts.push(format!("{} gold", gold));
    }
    if let Some(xp) = rewards.xp {
        parts.push(format!("{} XP", xp));
    }
    if let Some(item) = &rewards.item {
        parts.push(item.clone());
    }
    if parts.is_empty() {
        "nothing (rewards could not be applied)".to_string()
    } else {
        parts.join(", ")
    }
}

/// Show today's quest, creating a fresh one when none is active.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn quest(ctx: Context<'_>) -> Result<(), Error> {
    let (guild_id, user_id) = caller(&ctx)?;
    let quest = ctx.data().quests.get_or_create(guild_id, user_id).await?;

    let description = match ctx.data().quests.template(&quest.quest_key) {
        Some(template) => template.describe(quest.target),
        // The pool changed since this quest was rolled.
        None => format!(
            "{} ({}/{})",
            quest.quest_key, quest.progress, quest.target
        ),
    };

    let embed = serenity::CreateEmbed::new()
        .title("🎯 Daily Quest")
        .colour(serenity::Colour::GOLD)
        .field("Quest", description, false)
        .field(
            "Progress",
            format!("{}/{}", quest.progress, quest.target),
            true,
        )
        .field("Reward", reward_line(&quest), true)
        .footer(serenity::CreateEmbedFooter::new(
            "Resets 24 hours after creation",
        ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Report quest progress (normally driven by gameplay events).
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn progress(
    ctx: Context<'_>,
    #[description = "Progress units to record"]
    #[min = 1]
    amount: Option<u32>,
) -> Result<(), Error> {
    let (guild_id, user_id) = caller(&ctx)?;
    let amount = i64::from(amount.unwrap_or(1));

    match ctx
        .data()
        .quests
        .report_progress(guild_id, user_id, amount)
        .await?
    {
        ProgressReport::NoActiveQuest => {
            ctx.say("No quest today yet. Run `quest` to start one.")
                .await?;
        }
        ProgressReport::AlreadyClaimed { .. } => {
            ctx.say("Today's quest is already completed.").await?;
        }
        ProgressReport::Advanced { progress, target } => {
            ctx.say(format!("Progress recorded: {}/{}", progress, target))
                .await?;
        }
        ProgressReport::Completed { rewards, .. } => {
            let embed = serenity::CreateEmbed::new()
                .title("🎉 Quest Complete")
                .description(format!(
                    "Quest finished and auto-claimed! You earned: {}",
                    granted_line(&rewards)
                ))
                .colour(serenity::Colour::from_rgb(255, 255, 255));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
        }
    }
    Ok(())
}
