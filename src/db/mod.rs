mod profile;
mod quests;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// SQLite handle shared by every per-guild game table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens the database at `path`, creating the schema when needed.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path))?;
        Self::init_schema(&conn).context("Failed to initialise database schema.")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS daily_quests (
                guild_id INTEGER,
                user_id INTEGER,
                date TEXT,
                quest_key TEXT,
                progress INTEGER DEFAULT 0,
                target INTEGER DEFAULT 1,
                completed INTEGER DEFAULT 0,
                reward_gold INTEGER DEFAULT 0,
                reward_xp INTEGER DEFAULT 0,
                reward_item TEXT,
                created_ts INTEGER DEFAULT 0,
                PRIMARY KEY (guild_id, user_id, date)
            );
            CREATE TABLE IF NOT EXISTS user_xp (
                guild_id INTEGER,
                user_id INTEGER,
                xp INTEGER DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            CREATE TABLE IF NOT EXISTS user_profile (
                guild_id INTEGER,
                user_id INTEGER,
                max_hp INTEGER DEFAULT 100,
                hp INTEGER DEFAULT 100,
                atk INTEGER DEFAULT 10,
                def INTEGER DEFAULT 5,
                gold INTEGER DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            CREATE TABLE IF NOT EXISTS inventory (
                guild_id INTEGER,
                user_id INTEGER,
                item_name TEXT,
                qty INTEGER DEFAULT 0,
                PRIMARY KEY (guild_id, user_id, item_name)
            );",
        )
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
