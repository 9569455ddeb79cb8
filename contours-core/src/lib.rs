//! # contours-core
//!
//! Recherche et export GeoJSON des contours des bureaux de vote
//! (départements, circonscriptions législatives, communes).
//!
//! ## Features
//!
//! - Index de recherche en mémoire, insensible aux accents et à la casse
//! - Export `FeatureCollection` borné (comptage avant matérialisation)
//! - Repli insensible à la casse pour les noms de circonscription
//! - Backend abstrait ([`BoundaryStore`]) avec implémentation en mémoire
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contours_core::{Materializer, MemoryStore, SearchIndex, SearchScope};
//!
//! let store = MemoryStore::from_geojson(&std::fs::read_to_string("contours.geojson")?)?;
//! let index = SearchIndex::build(&store).await?;
//! let results = index.search("fleville", SearchScope::Commune);
//!
//! let materializer = Materializer::new(store);
//! let doc = materializer.departement("54").await?;
//! println!("{} features", doc.feature_count());
//! ```

pub mod error;
pub mod export;
pub mod materialize;
pub mod search;
pub mod store;
pub mod text;
pub mod types;

pub use error::{BackendError, ContoursError};
pub use materialize::{FeatureCollectionDocument, Materializer, DEFAULT_MAX_FEATURES};
pub use search::{SearchIndex, SearchResults, SearchScope, MAX_RESULTS};
pub use store::{BoundarySession, BoundaryStore, MemoryStore};
pub use text::{compose, fold, strip_accents};
pub use types::{
    BoundaryFilter, BoundaryRow, CirconscriptionEntry, CommuneEntry, DepartementEntry,
    NameMatching,
};
