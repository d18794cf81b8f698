use rusqlite::{params, OptionalExtension, Result};

use super::Database;
use crate::daily::DailyQuest;

impl Database {
    /// Returns the stored quest row for `(guild, user, day)`, if any.
    /// Freshness is judged by the caller; this is plain row access.
    pub fn daily_quest(&self, guild_id: u64, user_id: u64, day: &str) -> Result<Option<DailyQuest>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT quest_key, progress, target, completed, reward_gold, reward_xp, reward_item, created_ts
             FROM daily_quests WHERE guild_id=?1 AND user_id=?2 AND date=?3",
            params![guild_id as i64, user_id as i64, day],
            |row| {
                Ok(DailyQuest {
                    quest_key: row.get(0)?,
                    progress: row.get(1)?,
                    target: row.get(2)?,
                    completed: row.get::<_, i64>(3)? != 0,
                    reward_gold: row.get(4)?,
                    reward_xp: row.get(5)?,
                    reward_item: row.get(6)?,
                    created_ts: row.get(7)?,
                })
            },
        )
        .optional()
    }

    /// Writes a fresh quest row, replacing any previous one for the same day.
    #[allow(clippy::too_many_arguments)]
    pub fn create_daily_quest(
        &self,
        guild_id: u64,
        user_id: u64,
        day: &str,
        quest_key: &str,
        target: i64,
        reward_gold: i64,
        reward_xp: i64,
        reward_item: Option<&str>,
        created_ts: i64,
    ) -> Result<DailyQuest> {
        self.conn().execute(
            "INSERT OR REPLACE INTO daily_quests
             (guild_id, user_id, date, quest_key, progress, target, completed, reward_gold, reward_xp, reward_item, created_ts)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, ?6, ?7, ?8, ?9)",
            params![
                guild_id as i64,
                user_id as i64,
                day,
                quest_key,
                target,
                reward_gold,
                reward_xp,
                reward_item,
                created_ts
            ],
        )?;

        Ok(DailyQuest {
            quest_key: quest_key.to_string(),
            progress: 0,
            target,
            completed: false,
            reward_gold,
            reward_xp,
            reward_item: reward_item.map(str::to_string),
            created_ts,
        })
    }

    pub fn set_daily_progress(
        &self,
        guild_id: u64,
        user_id: u64,
        day: &str,
        progress: i64,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE daily_quests SET progress=?1 WHERE guild_id=?2 AND user_id=?3 AND date=?4",
            params![progress, guild_id as i64, user_id as i64, day],
        )?;
        Ok(())
    }

    pub fn mark_daily_completed(&self, guild_id: u64, user_id: u64, day: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE daily_quests SET completed=1 WHERE guild_id=?1 AND user_id=?2 AND date=?3",
            params![guild_id as i64, user_id as i64, day],
        )?;
        Ok(())
    }

    pub fn delete_daily_quest(&self, guild_id: u64, user_id: u64, day: &str) -> Result<()> {
        self.conn().execute(
            "DELETE FROM daily_quests WHERE guild_id=?1 AND user_id=?2 AND date=?3",
            params![guild_id as i64, user_id as i64, day],
        )?;
        Ok(())
    }
}
