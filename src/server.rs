//! HTTP server bootstrap for the view proof service.
//!
//! This module wires together:
//! - configuration
//! - the view and proof stores (PostgreSQL, or in-memory without `DATABASE_URL`)
//! - view deduplication, proof generation and the reconciliation worker
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::api::handlers::VIEWER_ID_HEADER;
use crate::domain::DEFAULT_VIEW_COOLDOWN_SECS;
use crate::infra::{
    MemoryStore, PgProofStore, PgViewStore, ProofStore, ProofVerifier, ViewCountReader,
    ViewStore, ZkProver,
};
use crate::metrics::MetricsRegistry;
use crate::proofs::{
    spawn_persister, ClaimVerifier, GeneratorConfig, HttpViewCountReader, HttpZkProver,
    PersisterConfig, PersisterMessage, ProofGenerator, ProofStatsPersister, ProofStatsTracker,
    DEFAULT_LOCAL_FALLBACK_ORIGIN,
};
use crate::views::ViewDeduplicator;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// PostgreSQL connection URL; in-memory storage when unset.
    pub database_url: Option<String>,
    /// Maximum database connections.
    pub max_connections: u32,
    pub migrate_on_startup: bool,
    pub view_cooldown: chrono::Duration,
    pub generator: GeneratorConfig,
    pub zk_prover_url: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    /// Comma-separated witness addresses accepted on proofs.
    pub trusted_witnesses: Option<String>,
    pub persister: PersisterConfig,
    pub cors_allow_origins: Option<String>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str, default: bool) -> bool {
    env_opt(name)
        .map(|v| {
            !matches!(
                v.to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            )
        })
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    env_opt(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid {name} {raw:?}: {e}"))
        })
        .transpose()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = env_parse("PORT")?.unwrap_or(3001);
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;

        let cooldown_secs: i64 =
            env_parse("VIEW_COOLDOWN_SECS")?.unwrap_or(DEFAULT_VIEW_COOLDOWN_SECS);
        if cooldown_secs < 0 {
            anyhow::bail!("VIEW_COOLDOWN_SECS must not be negative");
        }

        let stage_timeout =
            Duration::from_secs(env_parse("HTTP_TIMEOUT_SECS")?.unwrap_or(20u64));

        let generator = GeneratorConfig {
            client_app_url: env_opt("CLIENT_APP_URL"),
            local_fallback_origin: env_opt("LOCAL_FALLBACK_ORIGIN")
                .unwrap_or_else(|| DEFAULT_LOCAL_FALLBACK_ORIGIN.to_string()),
            stage_timeout,
            persist_fallback_proofs: env_flag("PERSIST_FALLBACK_PROOFS", true),
        };

        Ok(Self {
            listen_addr,
            database_url: env_opt("DATABASE_URL"),
            max_connections: env_parse("MAX_DB_CONNECTIONS")?.unwrap_or(10),
            migrate_on_startup: env_flag("DB_MIGRATE_ON_STARTUP", true),
            view_cooldown: chrono::Duration::seconds(cooldown_secs),
            generator,
            zk_prover_url: env_opt("ZK_PROVER_URL"),
            app_id: env_opt("APP_ID"),
            app_secret: env_opt("APP_SECRET"),
            trusted_witnesses: env_opt("ZK_TRUSTED_WITNESSES"),
            persister: PersisterConfig::from_env(),
            cors_allow_origins: env_opt("CORS_ALLOW_ORIGINS"),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub views: Arc<ViewDeduplicator>,
    pub view_store: Arc<dyn ViewStore>,
    pub proof_store: Arc<dyn ProofStore>,
    pub generator: Arc<ProofGenerator>,
    pub stats: Arc<ProofStatsTracker>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    pub fn new(
        view_store: Arc<dyn ViewStore>,
        proof_store: Arc<dyn ProofStore>,
        generator: Arc<ProofGenerator>,
        view_cooldown: chrono::Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let views = ViewDeduplicator::new(view_store.clone())
            .with_cooldown(view_cooldown)
            .with_metrics(metrics.clone());
        Self {
            views: Arc::new(views),
            view_store,
            proof_store,
            stats: generator.stats().clone(),
            generator,
            metrics,
        }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    info!("Starting view proof service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  View cooldown: {}s", config.view_cooldown.num_seconds());
    match &config.generator.client_app_url {
        Some(url) => info!("  Client app URL: {}", url),
        None => warn!("CLIENT_APP_URL not set; proof generation will fail"),
    }

    let (view_store, proof_store) = connect_stores(&config).await?;

    let metrics = Arc::new(MetricsRegistry::new());
    let stats = Arc::new(ProofStatsTracker::new());
    let generator = Arc::new(
        build_generator(&config, proof_store.clone(), stats.clone())?
            .with_metrics(metrics.clone()),
    );

    let persister = Arc::new(
        ProofStatsPersister::new(stats, view_store.clone(), proof_store.clone())
            .with_metrics(metrics.clone()),
    );
    let (persister_handle, persister_control) =
        spawn_persister(config.persister.clone(), persister);

    let state = AppState::new(
        view_store,
        proof_store,
        generator,
        config.view_cooldown,
        metrics,
    );

    let cors = cors_layer(config.cors_allow_origins.as_deref())?;
    let app = build_router(state, cors);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("View proof service is ready to accept connections");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if persister_control.send(PersisterMessage::Shutdown).await.is_ok() {
        let _ = persister_handle.await;
    }
    info!("View proof service stopped");

    Ok(())
}

async fn connect_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn ViewStore>, Arc<dyn ProofStore>)> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; using in-memory storage");
        let store = Arc::new(MemoryStore::new());
        let views: Arc<dyn ViewStore> = store.clone();
        let proofs: Arc<dyn ProofStore> = store;
        return Ok((views, proofs));
    };

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    info!("Connected to PostgreSQL");

    if config.migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    let views: Arc<dyn ViewStore> = Arc::new(PgViewStore::new(pool.clone()));
    let proofs: Arc<dyn ProofStore> = Arc::new(PgProofStore::new(pool));
    Ok((views, proofs))
}

/// Assemble the generator from configuration.
pub fn build_generator(
    config: &Config,
    proof_store: Arc<dyn ProofStore>,
    stats: Arc<ProofStatsTracker>,
) -> anyhow::Result<ProofGenerator> {
    let timeout = config.generator.stage_timeout;

    let prover: Option<Arc<dyn ZkProver>> = match &config.zk_prover_url {
        Some(url) => {
            info!("  ZK prover: {}", url);
            let prover = HttpZkProver::new(url.clone(), timeout)?
                .with_credentials(config.app_id.clone(), config.app_secret.clone());
            Some(Arc::new(prover))
        }
        None => {
            warn!("ZK_PROVER_URL not set; proofs will use direct verification only");
            None
        }
    };

    let verifier = ClaimVerifier::from_witness_list(config.trusted_witnesses.as_deref())
        .map_err(|e| anyhow::anyhow!("Invalid ZK_TRUSTED_WITNESSES: {e}"))?;
    let verifier: Arc<dyn ProofVerifier> = Arc::new(verifier);
    let reader: Arc<dyn ViewCountReader> = Arc::new(HttpViewCountReader::new(timeout)?);

    Ok(ProofGenerator::new(
        proof_store,
        prover,
        verifier,
        reader,
        stats,
        config.generator.clone(),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let json = env_opt("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.with_thread_ids(true).init();
    }
}

/// Build the full router: `/api`, the legacy root routes and health endpoints.
pub fn build_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let mut router = Router::new()
        .nest("/api", crate::api::router())
        .merge(crate::api::legacy_router())
        .route("/", get(crate::api::handlers::root))
        .route("/health", get(crate::api::handlers::health_check))
        .route("/ready", get(crate::api::handlers::readiness_check))
        .route("/metrics", get(crate::api::handlers::metrics))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router.with_state(state)
}

fn cors_layer(origins: Option<&str>) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origins) = origins.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
                HeaderName::from_static(VIEWER_ID_HEADER),
            ]),
    ))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
