//! Profile lookups: vanity resolution, owned games and player summaries.
//!
//! Each operation validates its input before touching the cache, goes
//! through the resource's cache tier and emits exactly one audit record.

use crate::audit::{AuditLogger, AuditParams, Endpoint};
use crate::cached_fetch::{validate_key_part, SteamFetchers};
use crate::errors::AppError;
use crate::models::{OwnedGames, PlayerSummary};

#[derive(Clone)]
pub struct ProfileService {
    fetchers: SteamFetchers,
    audit: AuditLogger,
}

impl ProfileService {
    pub fn new(fetchers: SteamFetchers, audit: AuditLogger) -> Self {
        Self { fetchers, audit }
    }

    /// Resolves a vanity name (e.g. `gaben`) to a 64-bit Steam ID.
    pub async fn resolve_vanity_name(&self, vanity_name: &str) -> Result<String, AppError> {
        let scope = self.audit.scope(
            Endpoint::ResolveVanityUrl,
            AuditParams::Vanity {
                vanity_name: vanity_name.to_string(),
            },
        );

        let result = async {
            validate_key_part(vanity_name, "vanity")?;
            self.fetchers.resolve_vanity(vanity_name).await
        }
        .await;

        scope.finish(&result);
        result
    }

    /// Games owned by `steam_id`. An empty library is a valid result.
    pub async fn list_owned_games(&self, steam_id: &str) -> Result<OwnedGames, AppError> {
        let scope = self.audit.scope(
            Endpoint::GetOwnedGames,
            AuditParams::Profile {
                steam_id: steam_id.to_string(),
            },
        );

        let result = async {
            validate_key_part(steam_id, "steamID")?;
            let games = self.fetchers.owned_games(steam_id).await?.response;
            tracing::debug!("{} owns {} games", steam_id, games.game_count);
            Ok(games)
        }
        .await;

        scope.finish(&result);
        result
    }

    /// Public profile of `steam_id`.
    pub async fn get_player_summary(&self, steam_id: &str) -> Result<PlayerSummary, AppError> {
        let scope = self.audit.scope(
            Endpoint::GetPlayerSummaries,
            AuditParams::Profile {
                steam_id: steam_id.to_string(),
            },
        );

        let result = async {
            validate_key_part(steam_id, "steamID")?;
            let summaries = self.fetchers.player_summaries(steam_id).await?.response;
            summaries
                .players
                .into_iter()
                .next()
                .ok_or_else(|| AppError::NotFound(format!("no player found for {}", steam_id)))
        }
        .await;

        scope.finish(&result);
        result
    }
}
