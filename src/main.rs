/// checks run before a command is dispatched
mod checks;
/// All available discord commands
mod commands;
/// Daily quest lifecycle
mod daily;
/// SQLite storage for per-guild game state
mod db;
/// discord setup
mod discord;
/// Shared enabled flag with cache and local fallback
mod flag;
mod logger;
/// Bot Settings
mod settings;
/// Bot state
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use daily::QuestTracker;
use db::Database;
use flag::{FlagCache, RedisFlagStore};
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    logger::init()?;

    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(_) => {
            Settings::default()
                .save()
                .await
                .context("Failed to save default config.")?;
            println!("Created default settings. Please fill out. Exiting...");
            std::process::exit(0);
        }
    };

    let db = Arc::new(Database::open(&settings.database_path).context("Failed to open database.")?);
    let pool = daily::load_pool(Path::new(&settings.quest_pool_path))
        .context("Failed to load quest pool.")?;
    let quests = QuestTracker::new(Arc::clone(&db), db.clone(), pool)
        .context("Failed to set up quest tracker.")?;

    let store = RedisFlagStore::new(&settings.redis_host, settings.redis_port)
        .context("Failed to set up flag store.")?;
    let flag = FlagCache::new(Arc::new(store), settings.flag_fallback_path.clone().into());

    discord::run(settings, quests, flag)
        .await
        .context("Failed to start discord.")
}
