//! Binary entrypoint: load configuration, connect the database, stand up
//! the model backend pool, assemble the RAG/auth/analytics stack, and
//! serve the HTTP surface.
//!
//! Grounded in `bravo1goingdark-ucfp::server::start_server`/`shutdown_signal`
//! for the bind-and-serve shape and graceful shutdown handling.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tsa_auth::{AuthService, PermissionCache, RateLimiter, TokenIssuer};
use tsa_core::config::Settings;
use tsa_model::BackendPool;
use tsa_rag::{Composer, HybridRetriever, Reranker, RetrieverConfig};
use tsa_server::analytics::Recorder;
use tsa_server::state::AppState;
use tsa_store::{CorrectionStore, DocumentStore, EventStore, GlossaryStore, RbacStore, VerificationTokenStore, WebCache};
use tsa_telemetry::{TelemetryConfig, init_telemetry};

/// Technical Service Assistant gateway.
#[derive(Debug, Parser)]
#[command(name = "tsa-gateway", version)]
struct Cli {
    /// Override `API_PORT` from the environment.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(port) = cli.port {
        settings.api_port = port;
    }
    let settings = Arc::new(settings);

    init_telemetry(TelemetryConfig::new("tsa-gateway").with_log_level(settings.log_level.clone()))
        .map_err(|err| anyhow::anyhow!("failed to initialize telemetry: {err}"))?;

    let pool = tsa_store::pool::connect(&settings).await?;
    tsa_store::pool::migrate(&pool).await?;

    let documents = Arc::new(DocumentStore::new(pool.clone()));
    let glossary = Arc::new(GlossaryStore::new(pool.clone()));
    let corrections = Arc::new(CorrectionStore::new(pool.clone()));
    let rbac = Arc::new(RbacStore::new(pool.clone()));
    let events = Arc::new(EventStore::new(pool.clone()));
    let web_cache = Arc::new(WebCache::new(
        pool.clone(),
        settings.web_cache_enabled,
        settings.web_cache_ttl,
        settings.web_cache_max_rows,
    ));

    let backend_pool = Arc::new(BackendPool::new(&settings.ollama_instances, Duration::from_secs(30)));
    let _probe_loop = backend_pool.spawn_probe_loop();

    let reranker = Reranker::new(Arc::clone(&backend_pool), settings.models.reasoning.clone());
    let retriever = Arc::new(HybridRetriever::new(
        Arc::clone(&documents),
        Arc::clone(&web_cache),
        Arc::clone(&backend_pool),
        reranker,
        RetrieverConfig {
            embedding_model: settings.models.embedding.clone(),
            embedding_timeout: settings.embedding_timeout,
            web_search_endpoint: settings.web_search_endpoint.clone(),
        },
    ));
    let composer = Arc::new(Composer::new(Arc::clone(&glossary)));

    let issuer = TokenIssuer::new(settings.jwt_secret.clone(), settings.jwt_access_ttl, settings.jwt_refresh_ttl);
    let permission_cache = PermissionCache::new(Duration::from_secs(60));
    let verification = VerificationTokenStore::new(pool.clone());
    let auth = Arc::new(AuthService::new(RbacStore::new(pool.clone()), verification, issuer, permission_cache));
    let rate_limiter = Arc::new(RateLimiter::default_policy());

    let recorder = Arc::new(Recorder::spawn(Arc::clone(&events)));

    let state = AppState {
        settings: Arc::clone(&settings),
        pool: backend_pool,
        documents,
        glossary,
        corrections,
        rbac,
        retriever,
        composer,
        auth,
        rate_limiter,
        recorder,
        events,
    };

    let metrics_handle = tsa_server::metrics::install_recorder();
    let app = tsa_server::build_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", settings.api_host, settings.api_port).parse()?;
    tracing::info!(%addr, "starting tsa-gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
