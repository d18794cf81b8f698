mod templates;

pub use templates::{load_pool, QuestTemplate, TargetSpec};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::Database;

/// Seconds until a quest is treated as absent, counted from creation.
const QUEST_LIFETIME_SECS: i64 = 86_400;

/// Wall clock seam. Quest identity uses the local calendar day while expiry
/// uses a rolling 24h window from creation, so both are sourced here.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_ts(&self) -> i64;
    /// Local calendar day, `%Y-%m-%d`.
    fn today(&self) -> String;
}

struct SystemClock;

impl Clock for SystemClock {
    fn now_ts(&self) -> i64 {
        chrono::Local::now().timestamp()
    }

    fn today(&self) -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }
}

/// Applies quest rewards to a player's profile and inventory. Each grant is
/// independently fallible.
#[async_trait]
pub trait RewardSink: Send + Sync {
    async fn grant_xp(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<()>;
    async fn grant_gold(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<()>;
    async fn grant_item(&self, guild_id: u64, user_id: u64, item: &str, qty: i64) -> Result<()>;
}

/// One stored daily quest.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyQuest {
    pub quest_key: String,
    pub progress: i64,
    pub target: i64,
    pub completed: bool,
    pub reward_gold: i64,
    pub reward_xp: i64,
    pub reward_item: Option<String>,
    pub created_ts: i64,
}

/// Reward lines which were actually granted on completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GrantedRewards {
    pub gold: Option<i64>,
    pub xp: Option<i64>,
    pub item: Option<String>,
}

/// Outcome of a progress report.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressReport {
    /// No unexpired quest exists. Progress never auto-creates one, so stray
    /// gameplay events can't silently start quests.
    NoActiveQuest,
    /// The stored quest was already completed; duplicate events are ignored.
    AlreadyClaimed { progress: i64, target: i64 },
    Advanced {
        progress: i64,
        target: i64,
    },
    Completed {
        progress: i64,
        target: i64,
        rewards: GrantedRewards,
    },
}

/// Daily quest lifecycle: lazy creation from the template pool, progress
/// accumulation and a single reward grant on completion.
pub struct QuestTracker {
    store: Arc<Database>,
    rewards: Arc<dyn RewardSink>,
    pool: Vec<QuestTemplate>,
    clock: Box<dyn Clock>,
    /// Serializes report_progress per (guild, user); the store has no atomic
    /// increment-and-check, so racing callers must queue here. Entries are
    /// kept for the process lifetime, bounded by the day's active players.
    locks: Mutex<HashMap<(u64, u64), Arc<Mutex<()>>>>,
}

impl QuestTracker {
    pub fn new(
        store: Arc<Database>,
        rewards: Arc<dyn RewardSink>,
        pool: Vec<QuestTemplate>,
    ) -> Result<Self> {
        Self::with_clock(store, rewards, pool, Box::new(SystemClock))
    }

    fn with_clock(
        store: Arc<Database>,
        rewards: Arc<dyn RewardSink>,
        pool: Vec<QuestTemplate>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        templates::validate_pool(&pool)?;
        Ok(Self {
            store,
            rewards,
            pool,
            clock,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the pooled template behind `key`, if it is still pooled.
    pub fn template(&self, key: &str) -> Option<&QuestTemplate> {
        self.pool.iter().find(|t| t.key == key)
    }

    /// Returns today's quest, rolling a fresh one when none exists or the
    /// stored one outlived its 24h window. Idempotent while a quest is live.
    pub async fn get_or_create(&self, guild_id: u64, user_id: u64) -> Result<DailyQuest> {
        let lock = self.key_lock(guild_id, user_id).await;
        let _guard = lock.lock().await;

        let now = self.clock.now_ts();
        let day = self.clock.today();
        if let Some(quest) = self.store.daily_quest(guild_id, user_id, &day)? {
            if now - quest.created_ts < QUEST_LIFETIME_SECS {
                return Ok(quest);
            }
        }

        // The replacement discards any stale progress on an expired row.
        let (key, target, reward_gold, reward_xp, reward_item) = {
            let mut rng = rand::thread_rng();
            let template = self.pool.choose(&mut rng).context("Quest pool is empty.")?;
            (
                template.key.clone(),
                template.target.roll(&mut rng),
                template.reward_gold,
                template.reward_xp,
                template.reward_item.clone(),
            )
        };

        let quest = self.store.create_daily_quest(
            guild_id,
            user_id,
            &day,
            &key,
            target,
            reward_gold,
            reward_xp,
            reward_item.as_deref(),
            now,
        )?;
        log::info!(
            "Rolled daily quest '{}' (target {}) for {}/{}",
            quest.quest_key,
            quest.target,
            guild_id,
            user_id
        );
        Ok(quest)
    }

    /// Records `amount` units of progress against today's quest. Crossing the
    /// target grants the rewards exactly once and removes the row, so the
    /// next `get_or_create` starts fresh.
    pub async fn report_progress(
        &self,
        guild_id: u64,
        user_id: u64,
        amount: i64,
    ) -> Result<ProgressReport> {
        let lock = self.key_lock(guild_id, user_id).await;
        let _guard = lock.lock().await;

        let now = self.clock.now_ts();
        let day = self.clock.today();
        let quest = match self.store.daily_quest(guild_id, user_id, &day)? {
            Some(quest) if now - quest.created_ts < QUEST_LIFETIME_SECS => quest,
            _ => return Ok(ProgressReport::NoActiveQuest),
        };
        if quest.completed {
            return Ok(ProgressReport::AlreadyClaimed {
                progress: quest.progress,
                target: quest.target,
            });
        }

        // Overshoot past the target is recorded as-is.
        let progress = quest.progress + amount;
        self.store
            .set_daily_progress(guild_id, user_id, &day, progress)?;
        if progress < quest.target {
            return Ok(ProgressReport::Advanced {
                progress,
                target: quest.target,
            });
        }

        self.store.mark_daily_completed(guild_id, user_id, &day)?;
        let rewards = self.grant_rewards(guild_id, user_id, &quest).await;
        // Drop the row so the next quest starts fresh. Should this fail, the
        // completed flag above still bars a second grant.
        if let Err(e) = self.store.delete_daily_quest(guild_id, user_id, &day) {
            log::warn!(
                "Failed to delete completed quest for {}/{}: {}",
                guild_id,
                user_id,
                e
            );
        }
        Ok(ProgressReport::Completed {
            progress,
            target: quest.target,
            rewards,
        })
    }

    // Best-effort: a failed line is logged and skipped, the rest still apply.
    async fn grant_rewards(&self, guild_id: u64, user_id: u64, quest: &DailyQuest) -> GrantedRewards {
        let mut granted = GrantedRewards::default();
        if quest.reward_xp > 0 {
            match self.rewards.grant_xp(guild_id, user_id, quest.reward_xp).await {
                Ok(()) => granted.xp = Some(quest.reward_xp),
                Err(e) => log::warn!(
                    "Failed to grant {} xp to {}/{}: {}",
                    quest.reward_xp,
                    guild_id,
                    user_id,
                    e
                ),
            }
        }
        if quest.reward_gold > 0 {
            match self
                .rewards
                .grant_gold(guild_id, user_id, quest.reward_gold)
                .await
            {
                Ok(()) => granted.gold = Some(quest.reward_gold),
                Err(e) => log::warn!(
                    "Failed to grant {} gold to {}/{}: {}",
                    quest.reward_gold,
                    guild_id,
                    user_id,
                    e
                ),
            }
        }
        if let Some(item) = &quest.reward_item {
            match self.rewards.grant_item(guild_id, user_id, item, 1).await {
                Ok(()) => granted.item = Some(item.clone()),
                Err(e) => log::warn!(
                    "Failed to grant item '{}' to {}/{}: {}",
                    item,
                    guild_id,
                    user_id,
                    e
                ),
            }
        }
        granted
    }

    async fn key_lock(&self, guild_id: u64, user_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry((guild_id, user_id)).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex as StdMutex;

    const GUILD: u64 = 10;
    const USER: u64 = 77;
    const DAY: &str = "2026-08-07";

    #[derive(Clone)]
    struct ManualClock {
        ts: Arc<AtomicI64>,
        day: Arc<StdMutex<String>>,
    }

    impl ManualClock {
        fn at(ts: i64) -> Self {
            Self {
                ts: Arc::new(AtomicI64::new(ts)),
                day: Arc::new(StdMutex::new(DAY.to_string())),
            }
        }

        fn advance(&self, secs: i64) {
            self.ts.fetch_add(secs, Ordering::SeqCst);
        }

        fn set_day(&self, day: &str) {
            *self.day.lock().unwrap() = day.to_string();
        }
    }

    impl Clock for ManualClock {
        fn now_ts(&self) -> i64 {
            self.ts.load(Ordering::SeqCst)
        }

        fn today(&self) -> String {
            self.day.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        grants: StdMutex<Vec<String>>,
        fail_gold: AtomicBool,
    }

    impl RecordingSink {
        fn grants(&self) -> Vec<String> {
            self.grants.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RewardSink for RecordingSink {
        async fn grant_xp(&self, _guild_id: u64, _user_id: u64, amount: i64) -> Result<()> {
            self.grants.lock().unwrap().push(format!("xp:{}", amount));
            Ok(())
        }

        async fn grant_gold(&self, _guild_id: u64, _user_id: u64, amount: i64) -> Result<()> {
            if self.fail_gold.load(Ordering::SeqCst) {
                anyhow::bail!("gold ledger offline");
            }
            self.grants.lock().unwrap().push(format!("gold:{}", amount));
            Ok(())
        }

        async fn grant_item(&self, _guild_id: u64, _user_id: u64, item: &str, qty: i64) -> Result<()> {
            self.grants
                .lock()
                .unwrap()
                .push(format!("item:{}x{}", item, qty));
            Ok(())
        }
    }

    fn template(key: &str, target: TargetSpec, gold: i64, xp: i64, item: Option<&str>) -> QuestTemplate {
        QuestTemplate {
            key: key.to_string(),
            description: format!("Do {{target}}x {} today", key),
            target,
            reward_gold: gold,
            reward_xp: xp,
            reward_item: item.map(str::to_string),
        }
    }

    fn tracker(
        pool: Vec<QuestTemplate>,
        clock: ManualClock,
        sink: Arc<RecordingSink>,
    ) -> (QuestTracker, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let tracker =
            QuestTracker::with_clock(Arc::clone(&db), sink, pool, Box::new(clock)).unwrap();
        (tracker, db)
    }

    #[tokio::test]
    async fn progress_accumulates_and_rewards_exactly_once() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template("adventures", TargetSpec::Fixed(3), 50, 20, None)];
        let (tracker, _db) = tracker(pool, clock, Arc::clone(&sink));

        tracker.get_or_create(GUILD, USER).await.unwrap();
        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::Advanced {
                progress: 1,
                target: 3
            }
        );
        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::Advanced {
                progress: 2,
                target: 3
            }
        );
        assert_eq!(
            tracker.report_progress(GUILD, USER, 2).await.unwrap(),
            ProgressReport::Completed {
                progress: 4,
                target: 3,
                rewards: GrantedRewards {
                    gold: Some(50),
                    xp: Some(20),
                    item: None,
                },
            }
        );
        assert_eq!(sink.grants(), vec!["xp:20".to_string(), "gold:50".to_string()]);

        // The completed row is gone; later events cannot re-claim.
        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::NoActiveQuest
        );
        assert_eq!(sink.grants().len(), 2);
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_within_the_day() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template(
            "collect_items",
            TargetSpec::Range { min: 2, max: 5 },
            30,
            15,
            None,
        )];
        let (tracker, _db) = tracker(pool, clock, sink);

        let first = tracker.get_or_create(GUILD, USER).await.unwrap();
        assert!((2..=5).contains(&first.target));

        let second = tracker.get_or_create(GUILD, USER).await.unwrap();
        assert_eq!(first, second);

        tracker.report_progress(GUILD, USER, 1).await.unwrap();
        let third = tracker.get_or_create(GUILD, USER).await.unwrap();
        assert_eq!(third.progress, 1);
        assert_eq!(third.target, first.target);
    }

    #[tokio::test]
    async fn quest_expires_24h_after_creation() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template("adventures", TargetSpec::Fixed(3), 50, 20, None)];
        let (tracker, _db) = tracker(pool, clock.clone(), Arc::clone(&sink));

        tracker.get_or_create(GUILD, USER).await.unwrap();
        tracker.report_progress(GUILD, USER, 2).await.unwrap();

        // The row is still stored, but reads treat it as absent now.
        clock.advance(QUEST_LIFETIME_SECS);
        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::NoActiveQuest
        );

        let fresh = tracker.get_or_create(GUILD, USER).await.unwrap();
        assert_eq!(fresh.progress, 0);
        assert_eq!(fresh.created_ts, 1_000 + QUEST_LIFETIME_SECS);
        assert!(sink.grants().is_empty());
    }

    #[tokio::test]
    async fn next_day_rolls_a_fresh_quest() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template("adventures", TargetSpec::Fixed(3), 50, 20, None)];
        let (tracker, _db) = tracker(pool, clock.clone(), sink);

        tracker.get_or_create(GUILD, USER).await.unwrap();
        tracker.report_progress(GUILD, USER, 1).await.unwrap();

        clock.set_day("2026-08-08");
        let fresh = tracker.get_or_create(GUILD, USER).await.unwrap();
        assert_eq!(fresh.progress, 0);
    }

    #[tokio::test]
    async fn completed_rows_are_not_reclaimed() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template("adventures", TargetSpec::Fixed(3), 50, 20, None)];
        let (tracker, db) = tracker(pool, clock, Arc::clone(&sink));

        tracker.get_or_create(GUILD, USER).await.unwrap();
        db.mark_daily_completed(GUILD, USER, DAY).unwrap();

        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::AlreadyClaimed {
                progress: 0,
                target: 3
            }
        );
        assert!(sink.grants().is_empty());
    }

    #[tokio::test]
    async fn reward_failures_are_best_effort() {
        let sink = Arc::new(RecordingSink::default());
        sink.fail_gold.store(true, Ordering::SeqCst);
        let clock = ManualClock::at(1_000);
        let pool = vec![template(
            "win_battles",
            TargetSpec::Fixed(1),
            100,
            50,
            Some("Minor Potion"),
        )];
        let (tracker, _db) = tracker(pool, clock, Arc::clone(&sink));

        tracker.get_or_create(GUILD, USER).await.unwrap();
        let report = tracker.report_progress(GUILD, USER, 1).await.unwrap();
        assert_eq!(
            report,
            ProgressReport::Completed {
                progress: 1,
                target: 1,
                rewards: GrantedRewards {
                    gold: None,
                    xp: Some(50),
                    item: Some("Minor Potion".to_string()),
                },
            }
        );

        // The failed gold line is not retried; the quest is done.
        assert_eq!(
            tracker.report_progress(GUILD, USER, 1).await.unwrap(),
            ProgressReport::NoActiveQuest
        );
    }

    #[tokio::test]
    async fn racing_reports_grant_once() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(1_000);
        let pool = vec![template("claims", TargetSpec::Fixed(2), 0, 10, None)];
        let (tracker, _db) = tracker(pool, clock, Arc::clone(&sink));

        tracker.get_or_create(GUILD, USER).await.unwrap();
        let (a, b) = tokio::join!(
            tracker.report_progress(GUILD, USER, 1),
            tracker.report_progress(GUILD, USER, 1)
        );

        let reports = vec![a.unwrap(), b.unwrap()];
        let completions = reports
            .iter()
            .filter(|r| matches!(r, ProgressReport::Completed { .. }))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(sink.grants(), vec!["xp:10".to_string()]);
    }
}
