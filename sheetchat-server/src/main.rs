mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use sheetchat_core::{Data, TokenService};
use sheetchat_database::{CacheService, Database, MIGRATOR};
use sheetchat_llm::LlmService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load the .env file
    dotenvy::dotenv().ok();

    let cfg = Config::from_env()?;

    init_tracing(cfg.log_json);

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    let db_pool = PgPoolOptions::new()
        .max_connections(cfg.database_max_connections)
        .connect(&cfg.database_url)
        .await?;
    info!("PostgreSQL connection established.");

    let mut cache = build_cache(&cfg);
    cache.configure_chat_rate_limit(cfg.chat_rate_limit_window, cfg.chat_rate_limit_max_hits);
    if cache.is_redis_enabled() {
        info!(
            chat_ratelimit_window_seconds = cache.chat_rate_limit_window().as_secs(),
            chat_ratelimit_max_hits = cache.chat_rate_limit_max_hits(),
            "Chat rate limit configured."
        );

        if let Err(err) = cache.ping().await {
            warn!(
                ?err,
                "Redis cache ping failed; cache operations will continue with fallback behavior."
            );
        } else {
            info!("Redis cache health check passed.");
        }
    }

    let db = Database::with_cache(db_pool, cache);

    if cfg.auto_run_migrations {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let llm = LlmService::from_env_optional()?;
    match &llm {
        Some(llm) => info!(provider = llm.provider_name(), "Assistant enabled."),
        None => info!("Assistant disabled (LLM_ENABLED=false or no provider configured)."),
    }

    if cfg.uses_dev_secret() {
        warn!("JWT_SECRET is not set; using the development secret. Do not run like this in production.");
    }

    let data = Arc::new(Data {
        db,
        llm,
        tokens: TokenService::new(cfg.jwt_secret.as_bytes(), cfg.jwt_ttl),
        settings: Arc::new(cfg.settings.clone()),
    });

    for route in sheetchat_routes::routes() {
        info!(method = route.method, path = route.path, "{}", route.desc);
    }

    let app = sheetchat_routes::router(data);
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sheetchat-server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn build_cache(cfg: &Config) -> CacheService {
    let prefix = cfg.redis_key_prefix.clone();

    if !cfg.redis_enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(prefix);
    }

    let Some(redis_url) = cfg.redis_url.as_deref() else {
        warn!(key_prefix = %prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
        return CacheService::disabled(prefix);
    };

    match CacheService::redis(redis_url, prefix.clone()) {
        Ok(cache) => {
            info!(key_prefix = %prefix, "Redis cache enabled.");
            cache
        }
        Err(err) => {
            warn!(?err, key_prefix = %prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
            CacheService::disabled(prefix)
        }
    }
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
