use crate::errors::AppError;
use crate::models::{
    GameSchemaResponse, GlobalAchievementPercentagesResponse, OwnedGamesResponse,
    PlayerStatsResponse, PlayerSummariesResponse, ResolveVanityResponse,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use url::Url;

const RESOLVE_VANITY_PATH: &str = "/ISteamUser/ResolveVanityURL/v0001/";
const OWNED_GAMES_PATH: &str = "/IPlayerService/GetOwnedGames/v1/";
const PLAYER_SUMMARIES_PATH: &str = "/ISteamUser/GetPlayerSummaries/v0002/";
const PLAYER_ACHIEVEMENTS_PATH: &str = "/ISteamUserStats/GetPlayerAchievements/v0001/";
const GAME_SCHEMA_PATH: &str = "/ISteamUserStats/GetSchemaForGame/v2/";
const GLOBAL_PERCENTAGES_PATH: &str =
    "/ISteamUserStats/GetGlobalAchievementPercentagesForApp/v0002/";

/// Classified failure of a single outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request URL could not be built from the parameters.
    RequestBuild(String),
    /// Connection, timeout or body-read failure.
    Transport(String),
    /// The provider answered with a non-2xx status.
    Status { code: u16, body: String },
    /// The body was not the JSON shape we expected.
    Decode(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RequestBuild(msg) => write!(f, "request creation failed: {}", msg),
            ProviderError::Transport(msg) => write!(f, "request failed: {}", msg),
            ProviderError::Status { code, body } => {
                write!(f, "Steam API responded with status {}: {}", code, body)
            }
            ProviderError::Decode(msg) => write!(f, "failed to decode JSON: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        let status = match &err {
            ProviderError::Status { code, .. } => Some(*code),
            _ => None,
        };
        AppError::UpstreamUnavailable {
            status,
            message: err.to_string(),
        }
    }
}

/// One method per Steam Web API resource we consume.
///
/// Implementations perform exactly one outbound call: no caching, no merging.
/// Dropping the returned future aborts the call.
#[async_trait]
pub trait SteamApi: Send + Sync {
    async fn resolve_vanity_url(
        &self,
        vanity_name: &str,
    ) -> Result<ResolveVanityResponse, ProviderError>;

    async fn get_owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, ProviderError>;

    async fn get_player_summaries(
        &self,
        steam_id: &str,
    ) -> Result<PlayerSummariesResponse, ProviderError>;

    async fn get_player_achievements(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<PlayerStatsResponse, ProviderError>;

    async fn get_schema_for_game(&self, app_id: &str)
        -> Result<GameSchemaResponse, ProviderError>;

    async fn get_global_achievement_percentages(
        &self,
        app_id: &str,
    ) -> Result<GlobalAchievementPercentagesResponse, ProviderError>;
}

/// reqwest-backed Steam Web API client.
#[derive(Clone)]
pub struct SteamClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SteamClient {
    /// Creates a new `SteamClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme and host of the Steam Web API (overridable for tests).
    /// * `api_key` - The Steam Web API key sent with every request.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::InternalError(format!("Failed to create Steam client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Builds the request URL with the API key and the given query parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        query.push(("key", self.api_key.as_str()));
        query.extend_from_slice(params);

        Url::parse_with_params(&format!("{}{}", self.base_url, path), &query)
            .map_err(|e| ProviderError::RequestBuild(e.to_string()))
    }

    /// Performs one GET and decodes the JSON body into `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = self.build_url(path, params)?;

        tracing::info!("Calling Steam {} with {:?}", operation, params);
        // Redact key from logs to prevent credential exposure
        tracing::debug!("Steam URL: {}{}?key=[REDACTED]", self.base_url, path);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!("Steam {} request failed: {}", operation, e);
            ProviderError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Steam {} returned error {}: {}", operation, status, body);
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::error!("Failed to decode Steam {} response: {}", operation, e);
            ProviderError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl SteamApi for SteamClient {
    async fn resolve_vanity_url(
        &self,
        vanity_name: &str,
    ) -> Result<ResolveVanityResponse, ProviderError> {
        self.get_json(
            "ResolveVanityURL",
            RESOLVE_VANITY_PATH,
            &[("vanityurl", vanity_name)],
        )
        .await
    }

    async fn get_owned_games(&self, steam_id: &str) -> Result<OwnedGamesResponse, ProviderError> {
        self.get_json(
            "GetOwnedGames",
            OWNED_GAMES_PATH,
            &[("steamid", steam_id), ("include_appinfo", "true")],
        )
        .await
    }

    async fn get_player_summaries(
        &self,
        steam_id: &str,
    ) -> Result<PlayerSummariesResponse, ProviderError> {
        self.get_json(
            "GetPlayerSummaries",
            PLAYER_SUMMARIES_PATH,
            &[("steamids", steam_id)],
        )
        .await
    }

    async fn get_player_achievements(
        &self,
        steam_id: &str,
        app_id: &str,
    ) -> Result<PlayerStatsResponse, ProviderError> {
        self.get_json(
            "GetPlayerAchievements",
            PLAYER_ACHIEVEMENTS_PATH,
            &[("appid", app_id), ("steamid", steam_id)],
        )
        .await
    }

    async fn get_schema_for_game(
        &self,
        app_id: &str,
    ) -> Result<GameSchemaResponse, ProviderError> {
        self.get_json("GetSchemaForGame", GAME_SCHEMA_PATH, &[("appid", app_id)])
            .await
    }

    async fn get_global_achievement_percentages(
        &self,
        app_id: &str,
    ) -> Result<GlobalAchievementPercentagesResponse, ProviderError> {
        self.get_json(
            "GetGlobalAchievementPercentagesForApp",
            GLOBAL_PERCENTAGES_PATH,
            &[("gameid", app_id)],
        )
        .await
    }
}
