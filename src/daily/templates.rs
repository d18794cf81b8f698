use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of the daily quest pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestTemplate {
    /// Stable identifier stored with the quest row.
    pub key: String,
    /// Display text, may contain a `{target}` placeholder.
    pub description: String,
    pub target: TargetSpec,
    #[serde(default)]
    pub reward_gold: i64,
    #[serde(default)]
    pub reward_xp: i64,
    #[serde(default)]
    pub reward_item: Option<String>,
}

/// Quest target, either fixed or rolled once at creation time.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Fixed(i64),
    Range { min: i64, max: i64 },
}

impl TargetSpec {
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i64 {
        match *self {
            TargetSpec::Fixed(n) => n,
            TargetSpec::Range { min, max } => rng.gen_range(min..=max),
        }
    }

    fn valid(&self) -> bool {
        match *self {
            TargetSpec::Fixed(n) => n > 0,
            TargetSpec::Range { min, max } => min > 0 && min <= max,
        }
    }
}

impl QuestTemplate {
    pub fn describe(&self, target: i64) -> String {
        self.description.replace("{target}", &target.to_string())
    }
}

/// Loads the quest pool from `path`, falling back to the built-in pool when
/// no file exists. A present but broken file is an error so a typo can't
/// silently shrink the pool.
pub fn load_pool(path: &Path) -> Result<Vec<QuestTemplate>> {
    if !path.exists() {
        return Ok(default_pool());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read quest pool from {}", path.display()))?;
    let pool: Vec<QuestTemplate> = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse quest pool from {}", path.display()))?;
    validate_pool(&pool)?;

    Ok(pool)
}

pub fn validate_pool(pool: &[QuestTemplate]) -> Result<()> {
    anyhow::ensure!(!pool.is_empty(), "Quest pool must not be empty.");
    for template in pool {
        anyhow::ensure!(
            template.target.valid(),
            "Quest '{}' needs a positive target.",
            template.key
        );
    }
    Ok(())
}

pub fn default_pool() -> Vec<QuestTemplate> {
    vec![
        QuestTemplate {
            key: "adventures".to_string(),
            description: "Go on {target} adventures today".to_string(),
            target: TargetSpec::Fixed(3),
            reward_gold: 50,
            reward_xp: 20,
            reward_item: None,
        },
        QuestTemplate {
            key: "claims".to_string(),
            description: "Claim a potion {target} times".to_string(),
            target: TargetSpec::Fixed(2),
            reward_gold: 20,
            reward_xp: 10,
            reward_item: None,
        },
        QuestTemplate {
            key: "win_battles".to_string(),
            description: "Defeat {target} monster in battle".to_string(),
            target: TargetSpec::Fixed(1),
            reward_gold: 100,
            reward_xp: 50,
            reward_item: Some("Minor Potion".to_string()),
        },
        QuestTemplate {
            key: "collect_items".to_string(),
            description: "Collect {target} items of any kind".to_string(),
            target: TargetSpec::Fixed(5),
            reward_gold: 30,
            reward_xp: 15,
            reward_item: None,
        },
    ]
}
