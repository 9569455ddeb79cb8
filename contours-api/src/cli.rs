//! Arguments de la ligne de commande et démarrage du service
//!
//! Deux backends:
//! - PostGIS (défaut), configuré par l'environnement (`PGHOST`, ...) et les options
//! - un fichier GeoJSON chargé en mémoire (`--geojson`), sans base de données

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use contours_core::{BoundaryStore, MemoryStore};

use crate::config::{DatasetConfig, ServerConfig};
use crate::server::{self, AppState};
use crate::store::{self, DatabaseConfig, PostgisStore, SslMode};

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Adresse d'écoute (défaut : env CONTOURS_BIND / 0.0.0.0:8000)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Répertoire des fichiers statiques (défaut : env CONTOURS_STATIC_DIR / static)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Nombre maximal de features par export (défaut : env CONTOURS_MAX_FEATURES / 50000)
    #[arg(long)]
    pub max_features: Option<u64>,

    /// Servir un fichier GeoJSON chargé en mémoire au lieu de PostGIS
    #[arg(long)]
    pub geojson: Option<PathBuf>,

    /// Schéma PostgreSQL de la table des contours (défaut : env CONTOURS_SCHEMA / public)
    #[arg(long)]
    pub schema: Option<String>,

    /// Table des contours (défaut : env CONTOURS_TABLE / contours)
    #[arg(long)]
    pub table: Option<String>,

    /// URL du fichier source, pour la date de mise à jour (défaut : env CONTOURS_SOURCE_URL)
    #[arg(long)]
    pub source_url: Option<String>,

    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / contours)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<SslMode>,
}

impl ServeArgs {
    /// Configuration serveur: environnement puis options
    pub fn server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::from_env()?;
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = dir.clone();
        }
        if let Some(max) = self.max_features {
            config.max_features = max;
        }
        Ok(config)
    }

    /// Configuration du jeu de données: environnement puis options
    pub fn dataset_config(&self) -> Result<DatasetConfig> {
        let mut dataset = DatasetConfig::from_env();
        if let Some(schema) = &self.schema {
            dataset.schema = schema.clone();
        }
        if let Some(table) = &self.table {
            dataset.table = table.clone();
        }
        if let Some(url) = &self.source_url {
            dataset.source_url = url.clone();
        }
        dataset.validate()?;
        Ok(dataset)
    }
}

/// Exécute la commande serve
pub async fn cmd_serve(args: ServeArgs) -> Result<()> {
    let server_config = args.server_config()?;
    let dataset = args.dataset_config()?;

    match &args.geojson {
        Some(path) => {
            info!(path = %path.display(), "Loading GeoJSON dataset in memory");
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let store = MemoryStore::from_geojson(&text)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            run(store, &server_config, &dataset).await
        }
        None => {
            let mut db_config = DatabaseConfig::from_env();
            db_config.apply_overrides(
                args.host,
                args.database,
                args.user,
                args.password,
                args.port,
                args.ssl,
            );
            info!(
                user = %db_config.user,
                host = %db_config.host,
                port = db_config.port,
                dbname = %db_config.dbname,
                ssl = ?db_config.ssl_mode,
                table = %dataset.qualified_table(),
                "Connecting to PostGIS"
            );

            let pool = store::create_pool(&db_config).await?;
            store::test_connection(&pool).await?;
            info!("Connected to PostgreSQL");

            run(PostgisStore::new(pool, &dataset), &server_config, &dataset).await
        }
    }
}

async fn run<S: BoundaryStore + 'static>(
    store: S,
    server_config: &ServerConfig,
    dataset: &DatasetConfig,
) -> Result<()> {
    let backend = store.backend_name();
    info!(backend, "Building search index");

    let state = AppState::build(store, server_config.max_features, &dataset.source_url)
        .await
        .context("Search index initialization failed, refusing to start")?;

    info!(
        backend,
        bind = %server_config.bind,
        static_dir = %server_config.static_dir.display(),
        max_features = server_config.max_features,
        last_update = state.info.last_update.as_deref().unwrap_or("unknown"),
        "=== Contours bureaux de vote ==="
    );

    server::serve(state, server_config).await
}
