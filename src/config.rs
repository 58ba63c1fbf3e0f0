use crate::cached_fetch::CacheTtls;
use std::time::Duration;

const DEFAULT_STEAM_API_BASE_URL: &str = "https://api.steampowered.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub steam_api_key: String,
    pub steam_api_base_url: String,
    /// Audit store. When absent, request history goes to the log.
    pub database_url: Option<String>,
    pub port: u16,
    pub request_timeout: Duration,
    /// Shared response cache. When absent, responses are cached in-process.
    pub redis_url: Option<String>,
    pub cache_max_capacity: u64,
    pub cache_ttls: CacheTtls,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let seconds = |name: &str, default: u64| -> anyhow::Result<Duration> {
            match var(name) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| anyhow::anyhow!("{} must be a positive number of seconds", name)),
            }
        };

        let defaults = CacheTtls::default();
        let player_ttl = seconds("CACHE_TTL_PLAYER_SECS", defaults.summary.as_secs())?;
        let cache_ttls = CacheTtls {
            vanity: seconds("CACHE_TTL_VANITY_SECS", defaults.vanity.as_secs())?,
            game_schema: seconds("CACHE_TTL_SCHEMA_SECS", defaults.game_schema.as_secs())?,
            global_percentages: seconds(
                "CACHE_TTL_PERCENTAGES_SECS",
                defaults.global_percentages.as_secs(),
            )?,
            ..defaults
        }
        .with_player_ttl(player_ttl);
        cache_ttls.validate()?;

        let config = Self {
            steam_api_key: var("STEAM_API_KEY")
                .ok_or_else(|| anyhow::anyhow!("STEAM_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("STEAM_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            steam_api_base_url: {
                let url = var("STEAM_API_BASE_URL")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_STEAM_API_BASE_URL.to_string());
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("STEAM_API_BASE_URL must start with http:// or https://");
                }
                url
            },
            database_url: var("DATABASE_URL")
                .or_else(|| var("POSTGRES_DSN"))
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            request_timeout: seconds("REQUEST_TIMEOUT_SECS", 10)?,
            redis_url: var("REDIS_ADDR")
                .filter(|s| !s.trim().is_empty())
                .map(|addr| redis_url(addr.trim())),
            cache_max_capacity: var("CACHE_MAX_CAPACITY")
                .unwrap_or_else(|| "100000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CACHE_MAX_CAPACITY must be a valid number"))?,
            cache_ttls,
        };

        // Never log the API key or the database credentials.
        tracing::debug!("Steam API base URL: {}", config.steam_api_base_url);
        tracing::debug!("Audit store configured: {}", config.database_url.is_some());
        tracing::debug!("Redis cache configured: {}", config.redis_url.is_some());
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Cache TTLs: {:?}", config.cache_ttls);

        Ok(config)
    }
}

/// Accepts a bare `host:port` (as in `REDIS_ADDR=localhost:6379`) or a full URL.
fn redis_url(addr: &str) -> String {
    if addr.starts_with("redis://") || addr.starts_with("rediss://") {
        addr.to_string()
    } else {
        format!("redis://{}/0", addr)
    }
}
