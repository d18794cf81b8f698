use anyhow::{Context, Result};
use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

const FILENAME: &str = "state.yaml";

/// Bot state which is not intended to be edited manually.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    /// Admins which are allowed to toggle maintenance.
    admins: HashSet<u64>,
}

impl State {
    pub fn new() -> Result<Self, ConfigError> {
        let state_path = std::env::var("BOT_STATE").unwrap_or_else(|_| FILENAME.to_string());

        let s = Config::builder()
            .add_source(File::with_name(&state_path))
            .build()?;

        s.try_deserialize()
    }

    pub fn admins(&self) -> &HashSet<u64> {
        &self.admins
    }

    pub fn is_admin(&self, id: u64) -> bool {
        self.admins.contains(&id)
    }

    /// adds an admin and saves it to the state file
    pub async fn add_admin(&mut self, id: u64) -> Result<()> {
        self.admins.insert(id);

        self.save().await?;
        Ok(())
    }

    /// removes an admin and saves it to the state file
    pub async fn remove_admin(&mut self, id: u64) -> Result<()> {
        self.admins.remove(&id);

        self.save().await?;
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        let state_path = std::env::var("BOT_STATE").unwrap_or_else(|_| FILENAME.to_string());

        let _ = tokio::fs::create_dir_all(PathBuf::from(&state_path).parent().unwrap()).await;
        let mut file = tokio::fs::File::create(&state_path).await?;
        file.write_all(
            serde_yaml::to_string(&self)
                .context("Failed to serialize state")?
                .as_bytes(),
        )
        .await?;
        file.sync_all().await?;
        Ok(())
    }
}
