use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use conclave_cache::BoundedCache;
use conclave_core::audit::JsonlAuditSink;
use conclave_core::config::ConclaveConfig;
use conclave_core::embedding::HashEmbedder;
use conclave_orchestrator::Orchestrator;
use conclave_store::{SqliteStore, StorePort};
use tracing::{info, warn};

mod app;
mod auth;
mod error;
mod http;

/// Conclave gateway — stateful conversational AI HTTP front-end.
#[derive(Parser)]
struct Cli {
    /// Path to the TOML config file (defaults to `CONCLAVE_CONFIG` or
    /// `~/.conclave/conclave.toml`).
    #[arg(long)]
    config: Option<String>,

    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conclave_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConclaveConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        ConclaveConfig::default()
    });
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    let config = Arc::new(config);

    let store: Arc<dyn conclave_store::StorePort> = Arc::new(SqliteStore::open(&config.database.path)?);
    for persona in conclave_store::default_personas() {
        if let Err(e) = store.seed_persona(&persona) {
            warn!(error = %e, persona = %persona.name, "persona seed failed");
        }
    }
    let cache: Arc<dyn conclave_cache::CachePort> = Arc::new(BoundedCache::default());
    let embedder: Arc<dyn conclave_core::embedding::EmbeddingPort> = Arc::new(HashEmbedder::default());
    let audit_sink: Arc<dyn conclave_core::audit::AuditSink> = Arc::new(JsonlAuditSink::open(&config.database.audit_log_path)?);

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        Arc::clone(&store),
        cache,
        embedder,
        audit_sink,
    ));

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    let state = Arc::new(app::AppState::new(config, store, orchestrator));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("conclave gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
