use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::daily::RewardSink;

impl Database {
    pub fn user_xp(&self, guild_id: u64, user_id: u64) -> rusqlite::Result<i64> {
        let conn = self.conn();
        let xp = conn
            .query_row(
                "SELECT xp FROM user_xp WHERE guild_id=?1 AND user_id=?2",
                params![guild_id as i64, user_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(xp.unwrap_or(0))
    }

    pub fn add_user_xp(&self, guild_id: u64, user_id: u64, delta: i64) -> rusqlite::Result<i64> {
        let total = self.user_xp(guild_id, user_id)? + delta;
        self.conn().execute(
            "INSERT INTO user_xp(guild_id, user_id, xp) VALUES (?1, ?2, ?3)
             ON CONFLICT(guild_id, user_id) DO UPDATE SET xp=?3",
            params![guild_id as i64, user_id as i64, total],
        )?;
        Ok(total)
    }

    /// Reads the player's gold, creating the default profile on first touch.
    pub fn gold(&self, guild_id: u64, user_id: u64) -> rusqlite::Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO user_profile(guild_id, user_id) VALUES (?1, ?2)",
            params![guild_id as i64, user_id as i64],
        )?;
        conn.query_row(
            "SELECT gold FROM user_profile WHERE guild_id=?1 AND user_id=?2",
            params![guild_id as i64, user_id as i64],
            |row| row.get(0),
        )
    }

    pub fn add_gold(&self, guild_id: u64, user_id: u64, amount: i64) -> rusqlite::Result<i64> {
        let total = self.gold(guild_id, user_id)? + amount;
        self.conn().execute(
            "UPDATE user_profile SET gold=?1 WHERE guild_id=?2 AND user_id=?3",
            params![total, guild_id as i64, user_id as i64],
        )?;
        Ok(total)
    }

    pub fn add_item(&self, guild_id: u64, user_id: u64, item: &str, qty: i64) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT INTO inventory(guild_id, user_id, item_name, qty) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(guild_id, user_id, item_name) DO UPDATE SET qty=qty+?4",
            params![guild_id as i64, user_id as i64, item, qty],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn item_qty(&self, guild_id: u64, user_id: u64, item: &str) -> rusqlite::Result<i64> {
        let conn = self.conn();
        let qty = conn
            .query_row(
                "SELECT qty FROM inventory WHERE guild_id=?1 AND user_id=?2 AND item_name=?3",
                params![guild_id as i64, user_id as i64, item],
                |row| row.get(0),
            )
            .optional()?;
        Ok(qty.unwrap_or(0))
    }
}

// The quest tracker pays out through this seam.
#[async_trait]
impl RewardSink for Database {
    async fn grant_xp(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<()> {
        self.add_user_xp(guild_id, user_id, amount)?;
        Ok(())
    }

    async fn grant_gold(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<()> {
        self.add_gold(guild_id, user_id, amount)?;
        Ok(())
    }

    async fn grant_item(&self, guild_id: u64, user_id: u64, item: &str, qty: i64) -> Result<()> {
        self.add_item(guild_id, user_id, item, qty)?;
        Ok(())
    }
}
