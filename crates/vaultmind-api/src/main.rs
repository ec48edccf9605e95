//! vaultmind-api - HTTP API server for vaultmind.
//!
//! Wires the metadata store, vector store, inference backends, indexing
//! pipeline, and query engine; runs a full indexing pass at startup; and
//! exposes the ask/index contracts over HTTP.

mod config;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vaultmind_core::{ChatBackend, EmbeddingBackend, VaultRepository, VectorStore};
use vaultmind_db::Database;
use vaultmind_index::{Indexer, IndexerConfig};
use vaultmind_inference::OllamaBackend;
use vaultmind_query::{QueryConfig, QueryEngine};

use config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Fatal if the metadata store is unreachable.
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let backend = Arc::new(OllamaBackend::from_env());
    let embedder: Arc<dyn EmbeddingBackend> = backend.clone();
    let chat: Arc<dyn ChatBackend> = backend.clone();

    let vaults = Arc::new(db.vaults);
    let notes = Arc::new(db.notes);
    let chunks = Arc::new(db.chunks);
    let points = Arc::new(db.points);

    for vault in &config.vaults {
        let stored = vaults.ensure(&vault.name, &vault.root).await?;
        info!(
            subsystem = "api",
            vault = %stored.name,
            root = %stored.root,
            "Vault registered"
        );
    }
    points.ensure_collection(embedder.dimension()).await?;

    let indexer = Indexer::new(
        vaults.clone(),
        notes.clone(),
        chunks.clone(),
        points.clone(),
        embedder.clone(),
        IndexerConfig::from_env(),
    );
    let engine = Arc::new(QueryEngine::new(
        vaults,
        notes,
        chunks,
        points,
        embedder,
        chat,
        QueryConfig::from_env(),
    ));

    let shutdown = CancellationToken::new();
    let state = AppState {
        engine,
        indexer: indexer.clone(),
        shutdown: shutdown.clone(),
    };

    // Startup indexing runs in the background so the server is
    // immediately able to answer over previously indexed content.
    {
        let indexer = indexer.clone();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = indexer.index_all(&cancel).await {
                warn!(subsystem = "api", error = %e, "Startup indexing failed");
            }
        });
    }

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/ask", post(handlers::ask))
        .route("/api/v1/index", post(handlers::index_all))
        .route("/api/v1/index/note", post(handlers::index_note))
        .route("/api/v1/index/clear", post(handlers::clear_all))
        .route("/api/v1/index/status", get(handlers::status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(subsystem = "api", %addr, "vaultmind-api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!(subsystem = "api", "Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
