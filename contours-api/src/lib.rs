//! # contours-api
//!
//! API HTTP des contours des bureaux de vote: recherche et téléchargement
//! GeoJSON par département, circonscription ou commune.
//!
//! ## Features
//!
//! - Backend PostGIS avec pool de connexions en lecture seule
//! - Backend GeoJSON en mémoire (sans base de données)
//! - Index de recherche construit au démarrage
//! - Exports plafonnés (413 au-delà de la limite)
//!
//! ## Usage CLI
//!
//! ```bash
//! # PostGIS (PGHOST, PGDATABASE, ... ou options)
//! contours-api --host localhost --database contours
//!
//! # Fichier GeoJSON local
//! contours-api --geojson ./data/20251108_contours_bureaux_vote.geojson
//! ```

pub mod cli;
pub mod config;
pub mod info;
pub mod server;
pub mod store;

pub use config::{DatasetConfig, ServerConfig};
pub use info::DatasetInfo;
pub use server::{router, AppState};
pub use store::{create_pool, DatabaseConfig, PostgisStore};
