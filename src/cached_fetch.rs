//! Read-through (cache-aside) fetchers, one per Steam resource.
//!
//! Every resource follows the same path: look the key up, return the cached
//! value if it decodes, otherwise call Steam, write the answer back with the
//! resource's TTL and return it. Cache trouble of any kind only costs a
//! remote call; it is logged and never returned to the caller.

use crate::cache_store::CacheStore;
use crate::errors::AppError;
use crate::models::{
    GameSchemaResponse, GlobalAchievementPercentagesResponse, OwnedGamesResponse,
    PlayerAchievements, PlayerStatsResponse, PlayerSummariesResponse,
};
use crate::steam_client::SteamApi;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cache key namespaces. No two resources share a prefix.
#[derive(Debug, Clone, Copy)]
pub enum CacheKey<'a> {
    Vanity(&'a str),
    OwnedGames(&'a str),
    Summary(&'a str),
    /// Joined result produced by the achievement aggregator.
    PlayerAchievements { steam_id: &'a str, app_id: &'a str },
    /// Raw per-player unlock records.
    FetchedPlayerAchievements { steam_id: &'a str, app_id: &'a str },
    GameSchema(&'a str),
    GlobalAchievementPercentages(&'a str),
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Vanity(name) => write!(f, "vanity:{}", name),
            CacheKey::OwnedGames(id) => write!(f, "owned_games:{}", id),
            CacheKey::Summary(id) => write!(f, "summary:{}", id),
            CacheKey::PlayerAchievements { steam_id, app_id } => {
                write!(f, "player_achievements:{}:game:{}", steam_id, app_id)
            }
            CacheKey::FetchedPlayerAchievements { steam_id, app_id } => {
                write!(f, "fetched_player_achievements:{}:game:{}", steam_id, app_id)
            }
            CacheKey::GameSchema(app_id) => write!(f, "game_schema:{}", app_id),
            CacheKey::GlobalAchievementPercentages(app_id) => {
                write!(f, "global_achievement_percentages:{}", app_id)
            }
        }
    }
}

/// Checks an identifier before it becomes part of a cache key.
///
/// Blank values are rejected, and so is `:`, the key separator: otherwise
/// `("a:game:b", "c")` and `("a", "b:game:c")` would share one entry.
pub fn validate_key_part(value: &str, name: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", name)));
    }
    if value.contains(':') {
        return Err(AppError::BadRequest(format!(
            "{} must not contain ':'",
            name
        )));
    }
    Ok(())
}

/// Lifetime of each cache tier.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheTtls {
    pub vanity: Duration,
    pub owned_games: Duration,
    pub summary: Duration,
    pub player_stats: Duration,
    pub player_achievements: Duration,
    pub game_schema: Duration,
    pub global_percentages: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        let five_minutes = Duration::from_secs(5 * 60);
        Self {
            vanity: five_minutes,
            owned_games: five_minutes,
            summary: five_minutes,
            player_stats: five_minutes,
            player_achievements: five_minutes,
            game_schema: Duration::from_secs(14 * 24 * 60 * 60),
            global_percentages: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl CacheTtls {
    /// Player-scoped tiers share one lifetime; title-scoped tiers keep theirs.
    pub fn with_player_ttl(mut self, ttl: Duration) -> Self {
        self.owned_games = ttl;
        self.summary = ttl;
        self.player_stats = ttl;
        self.player_achievements = ttl;
        self
    }

    /// The joined result goes stale as soon as its most volatile input does,
    /// so it may not outlive any of them.
    pub fn validate(&self) -> anyhow::Result<()> {
        let shortest = self
            .player_stats
            .min(self.game_schema)
            .min(self.global_percentages);

        if self.player_achievements > shortest {
            anyhow::bail!(
                "player achievements TTL ({:?}) must not exceed its shortest input TTL ({:?})",
                self.player_achievements,
                shortest
            );
        }
        Ok(())
    }
}

/// How a value is represented in the cache.
pub trait CacheCodec: Sized {
    fn to_cache(&self) -> Result<String, AppError>;
    fn from_cache(raw: &str) -> Result<Self, String>;
}

/// Resolved Steam IDs are cached as the raw ID text.
impl CacheCodec for String {
    fn to_cache(&self) -> Result<String, AppError> {
        Ok(self.clone())
    }

    fn from_cache(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty steam id".to_string());
        }
        Ok(raw.to_string())
    }
}

macro_rules! json_cache_codec {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl CacheCodec for $ty {
                fn to_cache(&self) -> Result<String, AppError> {
                    Ok(serde_json::to_string(self)?)
                }

                fn from_cache(raw: &str) -> Result<Self, String> {
                    serde_json::from_str(raw).map_err(|e| e.to_string())
                }
            }
        )+
    };
}

json_cache_codec!(
    OwnedGamesResponse,
    PlayerSummariesResponse,
    PlayerStatsResponse,
    GameSchemaResponse,
    GlobalAchievementPercentagesResponse,
    PlayerAchievements,
);

/// Returns the cached value for `key`, treating every failure as a miss.
pub async fn cache_lookup<T: CacheCodec>(cache: &dyn CacheStore, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match T::from_cache(&raw) {
            Ok(value) => {
                tracing::debug!("Cache HIT: {}", key);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        },
        Ok(None) => {
            tracing::debug!("Cache MISS: {}", key);
            None
        }
        Err(e) => {
            tracing::warn!("Cache read failed for {}, treating as miss: {}", key, e);
            None
        }
    }
}

/// Writes `value` under `key`. Failures are logged and otherwise ignored.
pub async fn cache_write<T: CacheCodec>(
    cache: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let encoded = match value.to_cache() {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!("Failed to encode {} for cache: {}", key, e);
            return;
        }
    };

    if let Err(e) = cache.set(key, encoded, ttl).await {
        tracing::warn!("Failed to cache {}: {}", key, e);
    }
}

/// Cache-aside read: cached value if present, otherwise `fetch` and write back.
///
/// Errors from `fetch` are returned unchanged and nothing is cached for them.
pub async fn read_through<T, F, Fut>(
    cache: &dyn CacheStore,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T, AppError>
where
    T: CacheCodec,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if let Some(hit) = cache_lookup(cache, key).await {
        return Ok(hit);
    }

    let value = fetch().await?;
    cache_write(cache, key, &value, ttl).await;
    Ok(value)
}

/// The six Steam resources, each behind its own cache tier.
#[derive(Clone)]
pub struct SteamFetchers {
    steam: Arc<dyn SteamApi>,
    cache: Arc<dyn CacheStore>,
    ttls: CacheTtls,
}

impl SteamFetchers {
    pub fn new(steam: Arc<dyn SteamApi>, cache: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self { steam, cache, ttls }
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Vanity name to Steam ID. Only a successful, non-empty resolution is cached.
    pub async fn resolve_vanity(&self, vanity_name: &str) -> Result<String, AppError> {
        let key = CacheKey::Vanity(vanity_name).to_string();
        read_through(self.cache(), &key, self.ttls.vanity, move || async move {
            let body = self.steam.resolve_vanity_url(vanity_name).await?.response;

            if body.success != 1 {
                let reason = body.message.unwrap_or_else(|| "No match".to_string());
                return Err(AppError::NotFound(format!(
                    "could not resolve vanity URL: {}",
                    reason
                )));
            }
            if body.steamid.is_empty() {
                return Err(AppError::NotFound(
                    "could not resolve vanity URL: empty steam id".to_string(),
                ));
            }
            Ok(body.steamid)
        })
        .await
    }

    pub async fn owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, AppError> {
        let key = CacheKey::OwnedGames(steam_id).to_string();
        read_through(self.cache(), &key, self.ttls.owned_games, move || async move {
            Ok(self.steam.get_owned_games(steam_id).await?)
        })
        .await
    }

    pub async fn player_summaries(
        &self,
        steam_id: &str,
    ) -> Result<PlayerSummariesResponse, AppError> {
        let key = CacheKey::Summary(steam_id).to_string();
        read_through(self.cache(), &key, self.ttls.summary, move || async move {
            Ok(self.steam.get_player_summaries(steam_id).await?)
        })
        .await
    }

    /// Unlock records. `success: false` on an HTTP 200 is a conflict, not cached.
    pub async fn player_stats(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<PlayerStatsResponse, AppError> {
        let key = CacheKey::FetchedPlayerAchievements { steam_id, app_id }.to_string();
        read_through(self.cache(), &key, self.ttls.player_stats, move || async move {
            let stats = self.steam.get_player_achievements(steam_id, app_id).await?;

            if !stats.playerstats.success {
                let reason = stats
                    .playerstats
                    .error
                    .unwrap_or_else(|| "invalid appID or private profile".to_string());
                return Err(AppError::Conflict(format!(
                    "player achievements unavailable: {}",
                    reason
                )));
            }
            Ok(stats)
        })
        .await
    }

    pub async fn game_schema(&self, app_id: &str) -> Result<GameSchemaResponse, AppError> {
        let key = CacheKey::GameSchema(app_id).to_string();
        read_through(self.cache(), &key, self.ttls.game_schema, move || async move {
            Ok(self.steam.get_schema_for_game(app_id).await?)
        })
        .await
    }

    pub async fn global_percentages(
        &self,
        app_id: &str,
    ) -> Result<GlobalAchievementPercentagesResponse, AppError> {
        let key = CacheKey::GlobalAchievementPercentages(app_id).to_string();
        read_through(self.cache(), &key, self.ttls.global_percentages, move || async move {
            Ok(self.steam.get_global_achievement_percentages(app_id).await?)
        })
        .await
    }
}
