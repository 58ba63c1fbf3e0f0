//! In-memory fakes shared by the unit tests.

use crate::audit::{AuditRecord, AuditSink};
use crate::cache_store::{CacheError, CacheStore, MokaCacheStore};
use crate::errors::AppError;
use crate::models::*;
use crate::steam_client::{ProviderError, SteamApi};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply<T> = Option<Result<T, ProviderError>>;

fn reply<T: Clone>(configured: &Reply<T>) -> Result<T, ProviderError> {
    configured
        .clone()
        .unwrap_or_else(|| Err(ProviderError::Transport("not configured".into())))
}

/// Scripted Steam API that counts calls per resource.
#[derive(Default)]
pub struct FakeSteam {
    pub vanity: Reply<ResolveVanityResponse>,
    pub owned_games: Reply<OwnedGamesResponse>,
    pub summaries: Reply<PlayerSummariesResponse>,
    pub player_stats: Reply<PlayerStatsResponse>,
    pub schema: Reply<GameSchemaResponse>,
    pub percentages: Reply<GlobalAchievementPercentagesResponse>,
    /// Delay applied before answering player stats requests.
    pub player_stats_delay: Option<Duration>,
    /// Delay applied before answering schema requests.
    pub schema_delay: Option<Duration>,
    pub calls: CallCounts,
}

#[derive(Default)]
pub struct CallCounts {
    pub vanity: AtomicUsize,
    pub owned_games: AtomicUsize,
    pub summaries: AtomicUsize,
    pub player_stats: AtomicUsize,
    pub schema: AtomicUsize,
    pub percentages: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        [
            &self.vanity,
            &self.owned_games,
            &self.summaries,
            &self.player_stats,
            &self.schema,
            &self.percentages,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[async_trait]
impl SteamApi for FakeSteam {
    async fn resolve_vanity_url(
        &self,
        _vanity_name: &str,
    ) -> Result<ResolveVanityResponse, ProviderError> {
        self.calls.vanity.fetch_add(1, Ordering::SeqCst);
        reply(&self.vanity)
    }

    async fn get_owned_games(&self, _steam_id: &str) -> Result<OwnedGamesResponse, ProviderError> {
        self.calls.owned_games.fetch_add(1, Ordering::SeqCst);
        reply(&self.owned_games)
    }

    async fn get_player_summaries(
        &self,
        _steam_id: &str,
    ) -> Result<PlayerSummariesResponse, ProviderError> {
        self.calls.summaries.fetch_add(1, Ordering::SeqCst);
        reply(&self.summaries)
    }

    async fn get_player_achievements(
        &self,
        _steam_id: &str,
        _app_id: &str,
    ) -> Result<PlayerStatsResponse, ProviderError> {
        self.calls.player_stats.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.player_stats_delay {
            tokio::time::sleep(delay).await;
        }
        reply(&self.player_stats)
    }

    async fn get_schema_for_game(
        &self,
        _app_id: &str,
    ) -> Result<GameSchemaResponse, ProviderError> {
        self.calls.schema.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.schema_delay {
            tokio::time::sleep(delay).await;
        }
        reply(&self.schema)
    }

    async fn get_global_achievement_percentages(
        &self,
        _app_id: &str,
    ) -> Result<GlobalAchievementPercentagesResponse, ProviderError> {
        self.calls.percentages.fetch_add(1, Ordering::SeqCst);
        reply(&self.percentages)
    }
}

/// Moka-backed store that remembers which keys were read and written.
pub struct RecordingCache {
    inner: MokaCacheStore,
    pub gets: Mutex<Vec<String>>,
    pub sets: Mutex<Vec<(String, Duration)>>,
}

impl Default for RecordingCache {
    fn default() -> Self {
        Self {
            inner: MokaCacheStore::new(1_000),
            gets: Mutex::new(Vec::new()),
            sets: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingCache {
    pub fn set_keys(&self) -> Vec<String> {
        self.sets
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn touched(&self) -> usize {
        self.gets.lock().unwrap().len() + self.sets.lock().unwrap().len()
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.lock().unwrap().push(key.to_string());
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.sets.lock().unwrap().push((key.to_string(), ttl));
        self.inner.set(key, value, ttl).await
    }
}

/// Cache whose backend is always unreachable.
pub struct BrokenCache;

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError("connection refused".into()))
    }
}

#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn save(&self, record: &AuditRecord) -> Result<(), AppError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn save(&self, _record: &AuditRecord) -> Result<(), AppError> {
        Err(AppError::InternalError("audit store down".into()))
    }
}

/// Waits until the detached audit tasks have delivered `expected` records.
pub async fn wait_for_records(sink: &Arc<RecordingAuditSink>, expected: usize) -> Vec<AuditRecord> {
    for _ in 0..200 {
        let records = sink.records();
        if records.len() >= expected {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} audit records, got {}",
        expected,
        sink.records().len()
    );
}

// ============ Fixtures ============
//
// Title "440", player "X": unlocks {A achieved, B not}, catalog {A, B, C},
// rarity {A: 10.5, B: 90.0}.

pub const UNLOCK_T1: i64 = 1_666_666_666;

pub fn player_stats_fixture() -> PlayerStatsResponse {
    PlayerStatsResponse {
        playerstats: PlayerStats {
            steam_id: "X".into(),
            game_name: "Team Fortress 2".into(),
            achievements: vec![
                AchievementUnlock {
                    apiname: "A".into(),
                    achieved: 1,
                    unlocktime: UNLOCK_T1,
                },
                AchievementUnlock {
                    apiname: "B".into(),
                    achieved: 0,
                    unlocktime: 0,
                },
            ],
            success: true,
            error: None,
        },
    }
}

pub fn definition(name: &str) -> AchievementDefinition {
    AchievementDefinition {
        name: name.into(),
        display_name: format!("Display {}", name),
        description: format!("Description {}", name),
        icon: format!("https://cdn/{}.jpg", name),
        icongray: format!("https://cdn/{}_gray.jpg", name),
        ..Default::default()
    }
}

pub fn schema_fixture() -> GameSchemaResponse {
    GameSchemaResponse {
        game: GameSchema {
            game_name: "Team Fortress 2".into(),
            game_version: "1".into(),
            available_game_stats: AvailableGameStats {
                achievements: vec![definition("A"), definition("B"), definition("C")],
            },
        },
    }
}

pub fn percentages_fixture() -> GlobalAchievementPercentagesResponse {
    GlobalAchievementPercentagesResponse {
        achievementpercentages: GlobalAchievementPercentages {
            achievements: vec![
                GlobalAchievementPercentage {
                    name: "A".into(),
                    percent: "10.5".into(),
                },
                GlobalAchievementPercentage {
                    name: "B".into(),
                    percent: "90.0".into(),
                },
            ],
        },
    }
}

/// Steam fake answering every achievement resource with the fixtures.
pub fn achievements_steam() -> FakeSteam {
    FakeSteam {
        player_stats: Some(Ok(player_stats_fixture())),
        schema: Some(Ok(schema_fixture())),
        percentages: Some(Ok(percentages_fixture())),
        ..Default::default()
    }
}
