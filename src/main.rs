use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::response::IntoResponse;
use tower::{util::MapResponseLayer, ServiceBuilder};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_steam_api::achievements::AchievementService;
use rust_steam_api::audit::{AuditLogger, AuditSink, PgAuditSink, TracingAuditSink};
use rust_steam_api::cache_store::{CacheStore, MokaCacheStore, RedisCacheStore};
use rust_steam_api::cached_fetch::SteamFetchers;
use rust_steam_api::config::Config;
use rust_steam_api::db::Database;
use rust_steam_api::handlers::{self, AppState};
use rust_steam_api::services::ProfileService;
use rust_steam_api::steam_client::SteamClient;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the optional audit database, the
/// response cache (Redis or in-process) and the Steam client, then starts
/// the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_steam_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let audit_sink: Arc<dyn AuditSink> = match &config.database_url {
        Some(url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgAuditSink::new(db.pool))
        }
        None => {
            tracing::warn!("No DATABASE_URL set, request history goes to the log only");
            Arc::new(TracingAuditSink)
        }
    };
    let audit = AuditLogger::new(audit_sink);

    let in_process = || -> Arc<dyn CacheStore> {
        tracing::info!(
            "In-process response cache initialized ({} max entries)",
            config.cache_max_capacity
        );
        Arc::new(MokaCacheStore::new(config.cache_max_capacity))
    };
    let cache: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => match RedisCacheStore::connect(url).await {
            Ok(store) => {
                tracing::info!("✓ Redis response cache connected");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!("Redis unavailable ({}), falling back to in-process cache", e);
                in_process()
            }
        },
        None => in_process(),
    };

    let steam = Arc::new(
        SteamClient::new(
            config.steam_api_base_url.clone(),
            config.steam_api_key.clone(),
            config.request_timeout,
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize Steam client: {}", e))?,
    );
    tracing::info!("✓ Steam client initialized: {}", config.steam_api_base_url);

    let fetchers = SteamFetchers::new(steam, cache, config.cache_ttls.clone());
    let app_state = Arc::new(AppState {
        profiles: ProfileService::new(fetchers.clone(), audit.clone()),
        achievements: AchievementService::new(fetchers, audit),
    });

    // Rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    // The request deadline covers every remote call made on its behalf.
    let request_deadline = config.request_timeout + Duration::from_secs(5);

    let protected_routes = handlers::routes(app_state).layer(
        ServiceBuilder::new()
            // Dropping the handler future cancels its outstanding Steam calls.
            .layer(TimeoutLayer::new(request_deadline))
            .layer(MapResponseLayer::new(IntoResponse::into_response))
            .layer(RequestBodyLimitLayer::new(64 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
