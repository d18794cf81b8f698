use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Key holding the flag in the primary store.
const FLAG_KEY: &str = "bot_enabled";

/// Primary key-value store for the shared enabled flag.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Reads the stored flag encoding, `None` when the key is absent.
    async fn get(&self) -> Result<Option<String>>;
    /// Stores `"true"`/`"false"`.
    async fn set(&self, value: bool) -> Result<()>;
    /// Cheap reachability check, bounded by `timeout`.
    async fn probe(&self, timeout: Duration) -> bool;
}

/// Redis-backed flag store.
pub struct RedisFlagStore {
    client: redis::Client,
    host: String,
    port: u16,
}

impl RedisFlagStore {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = redis::Client::open(format!("redis://{}:{}/", host, port))?;
        Ok(Self {
            client,
            host: host.to_string(),
            port,
        })
    }
}

#[async_trait]
impl FlagStore for RedisFlagStore {
    async fn get(&self) -> Result<Option<String>> {
        use redis::AsyncCommands;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(FLAG_KEY).await?)
    }

    async fn set(&self, value: bool) -> Result<()> {
        use redis::AsyncCommands;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let encoded = if value { "true" } else { "false" };
        let _: () = conn.set(FLAG_KEY, encoded).await?;
        Ok(())
    }

    // Connect-only TCP probe, avoids handing a full command to a dead store.
    async fn probe(&self, timeout: Duration) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        matches!(tokio::time::timeout(timeout, connect).await, Ok(Ok(_)))
    }
}
