use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const FILENAME: &str = "settings.yaml";

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Discord's bot token
    pub token: String,
    /// Discord account id which owns the bot
    pub owner: u64,
    /// Command prefix
    pub prefix: String,
    /// SQLite database holding all per-guild game state.
    pub database_path: String,
    /// Optional YAML file overriding the built-in daily quest pool.
    pub quest_pool_path: String,
    /// Redis host holding the shared enabled flag.
    pub redis_host: String,
    /// Redis port.
    pub redis_port: u16,
    /// Local file keeping the enabled flag across Redis outages.
    pub flag_fallback_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::from("DISCORD_BOT_TOKEN_HERE"),
            owner: 999999999,
            prefix: String::from("!"),
            database_path: String::from("bot.db"),
            quest_pool_path: String::from("quests.yaml"),
            redis_host: String::from("localhost"),
            redis_port: 6379,
            flag_fallback_path: String::from("bot_state.json"),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings_path = std::env::var("BOT_SETTINGS").unwrap_or_else(|_| FILENAME.to_string());

        // Start off with the configuration file, then let the environment
        // override single keys (e.g. `BOT_PREFIX=?` sets the `prefix` key).
        let s = Config::builder()
            .add_source(File::with_name(&settings_path))
            .add_source(Environment::with_prefix("BOT"))
            .build()?;

        s.try_deserialize()
    }

    pub async fn save(&self) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let settings_path = std::env::var("BOT_SETTINGS").unwrap_or_else(|_| FILENAME.to_string());

        let _ = tokio::fs::create_dir_all(PathBuf::from(&settings_path).parent().unwrap()).await;
        let mut file = tokio::fs::File::create(&settings_path).await?;
        file.write_all(
            serde_yaml::to_string(&self)
                .context("Failed to serialize settings")?
                .as_bytes(),
        )
        .await?;
        file.sync_all().await?;
        Ok(())
    }
}
