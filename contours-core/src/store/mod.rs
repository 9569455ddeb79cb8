//! Accès au jeu de données des contours
//!
//! Un [`BoundaryStore`] ouvre des sessions indépendantes, en lecture seule.
//! Une session n'est jamais partagée entre deux requêtes: aucune coordination
//! n'est nécessaire côté appelant.

pub mod memory;

use async_trait::async_trait;

use crate::error::ContoursError;
use crate::types::{BoundaryFilter, BoundaryRow, CirconscriptionEntry, CommuneEntry, DepartementEntry};

pub use memory::MemoryStore;

/// Source de données des contours
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    type Session: BoundarySession;

    /// Ouvre une nouvelle session en lecture seule
    async fn open_session(&self) -> Result<Self::Session, ContoursError>;

    /// Nom court du backend pour les logs
    fn backend_name(&self) -> &'static str;
}

/// Session de lecture sur le jeu de données
#[async_trait]
pub trait BoundarySession: Send + Sync {
    /// Nombre de lignes correspondant au filtre
    async fn count(&self, filter: &BoundaryFilter) -> Result<u64, ContoursError>;

    /// Lignes correspondant au filtre, dans l'ordre de lecture du backend,
    /// au plus `limit`
    async fn fetch(
        &self,
        filter: &BoundaryFilter,
        limit: u64,
    ) -> Result<Vec<BoundaryRow>, ContoursError>;

    /// Départements distincts, triés par nom
    async fn departements(&self) -> Result<Vec<DepartementEntry>, ContoursError>;

    /// Circonscriptions distinctes (nom, département), triées par nom
    async fn circonscriptions(&self) -> Result<Vec<CirconscriptionEntry>, ContoursError>;

    /// Communes distinctes, triées par nom
    async fn communes(&self) -> Result<Vec<CommuneEntry>, ContoursError>;
}
