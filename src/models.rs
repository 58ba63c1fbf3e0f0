use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============ Steam Web API Payloads ============
//
// Steam omits fields freely (private profiles, titles without stats), so
// every payload struct defaults missing fields instead of failing to decode.

/// `ISteamUser/ResolveVanityURL` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveVanityResponse {
    pub response: ResolveVanityBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveVanityBody {
    /// Resolved 64-bit Steam ID, as text.
    pub steamid: String,
    /// `1` on success; any other value means no match.
    pub success: i32,
    /// Provider explanation when `success != 1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `IPlayerService/GetOwnedGames` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnedGamesResponse {
    pub response: OwnedGames,
}

/// Titles owned by one profile, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnedGames {
    pub game_count: u32,
    pub games: Vec<OwnedGame>,
}

/// One owned title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnedGame {
    /// Numeric app identifier.
    pub appid: u64,
    /// Display name (present because we request `include_appinfo`).
    pub name: String,
    /// Cumulative playtime in minutes.
    pub playtime_forever: u64,
    pub img_icon_url: String,
    pub img_logo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_community_visible_stats: Option<bool>,
}

/// `ISteamUser/GetPlayerSummaries` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSummariesResponse {
    pub response: PlayerSummaries,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSummaries {
    pub players: Vec<PlayerSummary>,
}

/// Public profile record for one Steam ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSummary {
    pub steamid: String,
    /// 1 = private, 2 = friends only, 3 = public.
    pub communityvisibilitystate: i32,
    /// 1 when the user has configured a community profile.
    pub profilestate: i32,
    pub personaname: String,
    pub commentpermission: i32,
    pub profileurl: String,
    pub avatar: String,
    pub avatarmedium: String,
    pub avatarfull: String,
    pub avatarhash: String,
    pub lastlogoff: i64,
    /// 0 offline, 1 online, 2 busy, 3 away, 4 snooze, 5 looking to trade, 6 looking to play.
    pub personastate: i32,
    pub realname: String,
    pub primaryclanid: String,
    /// Account creation, Unix seconds.
    pub timecreated: i64,
    pub personastateflags: i32,
    pub loccountrycode: String,
    pub locstatecode: String,
}

/// `ISteamUserStats/GetPlayerAchievements` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStatsResponse {
    pub playerstats: PlayerStats,
}

/// Per-player unlock state for one title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    #[serde(rename = "steamID")]
    pub steam_id: String,
    #[serde(rename = "gameName")]
    pub game_name: String,
    pub achievements: Vec<AchievementUnlock>,
    /// Semantic success flag; `false` even on HTTP 200 for private profiles
    /// or titles without stats.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Unlock record for one achievement key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementUnlock {
    pub apiname: String,
    /// 0 or 1.
    pub achieved: u8,
    /// Unix seconds; meaningful only when `achieved == 1`.
    pub unlocktime: i64,
}

/// `ISteamUserStats/GetSchemaForGame` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSchemaResponse {
    pub game: GameSchema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSchema {
    #[serde(rename = "gameName")]
    pub game_name: String,
    #[serde(rename = "gameVersion")]
    pub game_version: String,
    #[serde(rename = "availableGameStats")]
    pub available_game_stats: AvailableGameStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableGameStats {
    pub achievements: Vec<AchievementDefinition>,
}

/// Catalog entry for one achievement key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementDefinition {
    pub name: String,
    pub defaultvalue: i64,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub hidden: i32,
    pub description: String,
    pub icon: String,
    pub icongray: String,
}

/// `ISteamUserStats/GetGlobalAchievementPercentagesForApp` response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalAchievementPercentagesResponse {
    pub achievementpercentages: GlobalAchievementPercentages,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalAchievementPercentages {
    pub achievements: Vec<GlobalAchievementPercentage>,
}

/// Share of all players who unlocked one achievement key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalAchievementPercentage {
    pub name: String,
    /// Percentage as text ("10.5"); some app versions send a bare number.
    #[serde(deserialize_with = "string_or_number")]
    pub percent: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

// ============ Aggregated Output ============

/// Catalog entry joined with the player's unlock state and global rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    /// Achievement key (`apiname`).
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub achieved: bool,
    /// Set only when achieved and the provider timestamp was positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_time: Option<DateTime<Utc>>,
    pub icon: String,
    pub icon_gray: String,
    /// Percentage of all players holding this achievement, 0 when unknown.
    pub rarity: f64,
}

/// Enriched achievements for one (profile, title) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAchievements {
    #[serde(rename = "steamID")]
    pub steam_id: String,
    #[serde(rename = "gameName")]
    pub game_name: String,
    pub achievements: Vec<Achievement>,
}

// ============ HTTP Request/Response Models ============

#[derive(Debug, Deserialize)]
pub struct VanityQueryParams {
    pub vanity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SteamIdQueryParams {
    #[serde(rename = "steamID")]
    pub steam_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AchievementsQueryParams {
    #[serde(rename = "steamID")]
    pub steam_id: Option<String>,
    #[serde(rename = "appID")]
    pub app_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VanityResponse {
    #[serde(rename = "steamID")]
    pub steam_id: String,
}
