use crate::achievements::AchievementService;
use crate::errors::AppError;
use crate::models::*;
use crate::services::ProfileService;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Vanity resolution, owned games and player summaries.
    pub profiles: ProfileService,
    /// Enriched per-title achievements.
    pub achievements: AchievementService,
}

/// Routes served by the API, without rate limiting or transport layers.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/steam_id", get(get_steam_id))
        .route("/games", get(get_owned_games))
        .route("/summary", get(get_summary))
        .route("/achievements", get(get_achievements))
        .with_state(state)
}

/// Liveness check.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "msg": "pong" }))
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-steam-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /steam_id?vanity=
///
/// Resolves a vanity profile name to its Steam ID.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Query parameters containing the vanity name.
///
/// # Returns
///
/// * `Result<Json<VanityResponse>, AppError>` - The resolved Steam ID or an error.
pub async fn get_steam_id(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VanityQueryParams>,
) -> Result<Json<VanityResponse>, AppError> {
    tracing::info!("GET /steam_id - params: {:?}", params);

    let steam_id = state
        .profiles
        .resolve_vanity_name(&params.vanity.unwrap_or_default())
        .await?;

    Ok(Json(VanityResponse { steam_id }))
}

/// GET /games?steamID=
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Query parameters containing the Steam ID.
pub async fn get_owned_games(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SteamIdQueryParams>,
) -> Result<Json<OwnedGames>, AppError> {
    tracing::info!("GET /games - params: {:?}", params);

    let games = state
        .profiles
        .list_owned_games(&params.steam_id.unwrap_or_default())
        .await?;

    Ok(Json(games))
}

/// GET /summary?steamID=
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SteamIdQueryParams>,
) -> Result<Json<PlayerSummary>, AppError> {
    tracing::info!("GET /summary - params: {:?}", params);

    let summary = state
        .profiles
        .get_player_summary(&params.steam_id.unwrap_or_default())
        .await?;

    Ok(Json(summary))
}

/// GET /achievements?steamID=&appID=
///
/// Returns the player's achievements for one title, joined with the title's
/// catalog and global rarity.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Query parameters containing the Steam ID and app ID.
///
/// # Returns
///
/// * `Result<Json<PlayerAchievements>, AppError>` - The enriched achievements or an error.
pub async fn get_achievements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AchievementsQueryParams>,
) -> Result<Json<PlayerAchievements>, AppError> {
    tracing::info!("GET /achievements - params: {:?}", params);

    let steam_id = params.steam_id.unwrap_or_default();
    let app_id = params.app_id.unwrap_or_default();
    let achievements = state
        .achievements
        .get_player_achievements(&steam_id, &app_id)
        .await?;

    Ok(Json(achievements))
}
