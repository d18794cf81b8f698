use anyhow::Result;
use poise::serenity_prelude as serenity;
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::{
    checks, commands, daily::QuestTracker, flag::FlagCache, settings::Settings, state::State,
};

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Everything the command handlers share.
pub struct Data {
    pub settings: Settings,
    pub state: Mutex<State>,
    pub quests: QuestTracker,
    pub flag: FlagCache,
}

pub async fn run(settings: Settings, quests: QuestTracker, flag: FlagCache) -> Result<()> {
    let token = settings.token.clone();

    let options = poise::FrameworkOptions {
        commands: vec![
            commands::quest(),
            commands::progress(),
            commands::about(),
            commands::status(),
            commands::help(),
            commands::maintenance(),
            commands::admin(),
            commands::quit(),
        ],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(settings.prefix.clone()),
            case_insensitive_commands: true,
            ..Default::default()
        },
        owners: HashSet::from([serenity::UserId::new(settings.owner)]),
        // Gates every command behind the shared enabled flag.
        command_check: Some(|ctx| Box::pin(checks::maintenance(ctx))),
        pre_command: |ctx| {
            Box::pin(async move {
                log::info!(
                    "Got command '{}' by user '{}'",
                    ctx.command().qualified_name,
                    ctx.author().tag()
                );
            })
        },
        on_error: |error| Box::pin(on_error(error)),
        ..Default::default()
    };

    let state = State::new().unwrap_or_default();

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                log::info!("Connected as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                ctx.set_activity(Some(serenity::ActivityData::playing("daily quests")));
                Ok(Data {
                    settings,
                    state: Mutex::new(state),
                    quests,
                    flag,
                })
            })
        })
        .build();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;
    Ok(client.start().await?)
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            log::error!(
                "Command '{}' failed: {:?}",
                ctx.command().qualified_name,
                error
            );
            let _ = ctx
                .say("Something went wrong while handling this command.")
                .await;
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                log::error!("Error while handling error: {}", e);
            }
        }
    }
}
