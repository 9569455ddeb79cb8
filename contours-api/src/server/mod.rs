//! Serveur HTTP (axum)
//!
//! L'index de recherche est construit avant l'ouverture du port: le service
//! ne répond jamais avec un index partiel.

pub mod error;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use contours_core::{BoundaryStore, ContoursError, Materializer, SearchIndex};

use crate::config::ServerConfig;
use crate::info::DatasetInfo;

pub use error::ApiError;

/// État partagé entre les handlers (lecture seule)
pub struct AppState<S> {
    pub index: Arc<SearchIndex>,
    pub materializer: Arc<Materializer<S>>,
    pub info: Arc<DatasetInfo>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            materializer: Arc::clone(&self.materializer),
            info: Arc::clone(&self.info),
        }
    }
}

impl<S: BoundaryStore> AppState<S> {
    /// Construit l'index puis l'état complet; toute erreur est fatale
    pub async fn build(store: S, max_features: u64, source_url: &str) -> Result<Self, ContoursError> {
        let index = SearchIndex::build(&store).await?;
        Ok(Self {
            index: Arc::new(index),
            materializer: Arc::new(Materializer::with_max_features(store, max_features)),
            info: Arc::new(DatasetInfo::from_source(source_url)),
        })
    }
}

/// Routes de l'API et fichiers statiques
pub fn router<S: BoundaryStore + 'static>(state: AppState<S>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api", get(routes::api_root))
        .route("/api/info", get(routes::info::<S>))
        .route("/search", get(routes::search::<S>))
        .route(
            "/download/departement/:code",
            get(routes::download_departement::<S>),
        )
        .route(
            "/download/circonscription/:departement/:name",
            get(routes::download_circonscription::<S>),
        )
        .route("/download/commune/:code", get(routes::download_commune::<S>))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Démarre le serveur et attend Ctrl+C
pub async fn serve<S: BoundaryStore + 'static>(state: AppState<S>, config: &ServerConfig) -> Result<()> {
    let app = router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
    }
}
