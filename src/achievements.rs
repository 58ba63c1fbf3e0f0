//! Achievement aggregation.
//!
//! Joins three independently cached Steam resources into one enriched view:
//! 1. Per-player unlock records (drives the result, defines its order)
//! 2. The title's achievement catalog (display names, descriptions, icons)
//! 3. Global unlock percentages (rarity)
//!
//! The joined result has its own cache tier, checked before any of the
//! inputs. A result is only cached once all three inputs were fetched.

use crate::audit::{AuditLogger, AuditParams, Endpoint};
use crate::cached_fetch::{
    cache_lookup, cache_write, validate_key_part, CacheKey, SteamFetchers,
};
use crate::errors::AppError;
use crate::models::{
    Achievement, AchievementDefinition, GameSchema, GlobalAchievementPercentages,
    PlayerAchievements, PlayerStats,
};
use chrono::DateTime;
use std::collections::HashMap;

#[derive(Clone)]
pub struct AchievementService {
    fetchers: SteamFetchers,
    audit: AuditLogger,
}

impl AchievementService {
    pub fn new(fetchers: SteamFetchers, audit: AuditLogger) -> Self {
        Self { fetchers, audit }
    }

    /// Enriched achievements of `steam_id` for title `app_id`.
    ///
    /// Fails closed: if any of the three inputs cannot be fetched the whole
    /// call fails and nothing is cached.
    pub async fn get_player_achievements(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<PlayerAchievements, AppError> {
        let scope = self.audit.scope(
            Endpoint::GetPlayerAchievements,
            AuditParams::Achievements {
                steam_id: steam_id.to_string(),
                app_id: app_id.to_string(),
            },
        );

        let result = self.load(steam_id, app_id).await;
        scope.finish(&result);
        result
    }

    async fn load(&self, steam_id: &str, app_id: &str) -> Result<PlayerAchievements, AppError> {
        validate_key_part(steam_id, "steamID")?;
        validate_key_part(app_id, "appID")?;

        let cache = self.fetchers.cache();
        let key = CacheKey::PlayerAchievements { steam_id, app_id }.to_string();

        if let Some(cached) = cache_lookup::<PlayerAchievements>(cache, &key).await {
            return Ok(cached);
        }

        let stats = self.fetchers.player_stats(steam_id, app_id);
        let catalog = async {
            tokio::try_join!(
                self.fetchers.game_schema(app_id),
                self.fetchers.global_percentages(app_id),
            )
        };
        tokio::pin!(stats, catalog);

        // A failed unlock fetch drops the catalog fetches. A failed catalog
        // fetch is only reported once the unlock fetch has succeeded.
        let (stats, (schema, percentages)) = tokio::select! {
            biased;
            unlocks = &mut stats => (unlocks?, catalog.await?),
            fetched = &mut catalog => match fetched {
                Ok(fetched) => (stats.await?, fetched),
                Err(err) => {
                    stats.await?;
                    return Err(err);
                }
            },
        };

        let result = merge_achievements(
            &stats.playerstats,
            &schema.game,
            &percentages.achievementpercentages,
        );

        tracing::info!(
            "Aggregated {} achievements for {} in app {}",
            result.achievements.len(),
            steam_id,
            app_id
        );

        cache_write(
            cache,
            &key,
            &result,
            self.fetchers.ttls().player_achievements,
        )
        .await;

        Ok(result)
    }
}

/// Inner join of unlock records with the catalog, decorated with rarity.
///
/// Order follows the unlock records. Keys missing from the catalog are
/// dropped; keys missing from the rarity list get a rarity of 0.
pub fn merge_achievements(
    stats: &PlayerStats,
    schema: &GameSchema,
    percentages: &GlobalAchievementPercentages,
) -> PlayerAchievements {
    let catalog: HashMap<&str, &AchievementDefinition> = schema
        .available_game_stats
        .achievements
        .iter()
        .map(|def| (def.name.as_str(), def))
        .collect();

    let rarity: HashMap<&str, f64> = percentages
        .achievements
        .iter()
        .filter_map(|p| {
            let value = p.percent.trim().parse::<f64>().ok()?;
            value.is_finite().then_some((p.name.as_str(), value))
        })
        .collect();

    let achievements = stats
        .achievements
        .iter()
        .filter_map(|unlock| {
            let def = catalog.get(unlock.apiname.as_str())?;
            let achieved = unlock.achieved == 1;
            let unlock_time = if achieved && unlock.unlocktime > 0 {
                let parsed = DateTime::from_timestamp(unlock.unlocktime, 0);
                if parsed.is_none() {
                    tracing::warn!(
                        "Unlock time {} of {} is out of range, omitting it",
                        unlock.unlocktime,
                        unlock.apiname
                    );
                }
                parsed
            } else {
                None
            };

            Some(Achievement {
                name: def.name.clone(),
                display_name: def.display_name.clone(),
                description: def.description.clone(),
                achieved,
                unlock_time,
                icon: def.icon.clone(),
                icon_gray: def.icongray.clone(),
                rarity: rarity.get(unlock.apiname.as_str()).copied().unwrap_or(0.0),
            })
        })
        .collect();

    PlayerAchievements {
        steam_id: stats.steam_id.clone(),
        game_name: stats.game_name.clone(),
        achievements,
    }
}
