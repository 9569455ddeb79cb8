//! Types d'erreurs pour le crate contours-core

use thiserror::Error;

/// Erreur de bas niveau remontée par un backend de données
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Erreurs pouvant survenir lors d'une recherche ou d'un export
#[derive(Debug, Error)]
pub enum ContoursError {
    /// Aucune ligne ne correspond au filtre (après repli éventuel)
    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    /// Trop de features pour un export unitaire
    #[error("Export too large: {count} features (max {max}), use bulk access instead")]
    SizeExceeded { count: u64, max: u64 },

    /// Backend injoignable ou en erreur (I/O, requête invalide, géométrie illisible)
    #[error("Dataset backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),

    /// Échec de construction de l'index ou du backend au démarrage
    #[error("Initialization failed: {reason}")]
    InitializationFailure {
        reason: String,
        #[source]
        source: Option<BackendError>,
    },
}

impl ContoursError {
    /// Crée une erreur "introuvable" pour une catégorie donnée
    pub fn not_found(kind: &'static str) -> Self {
        Self::NotFound { kind }
    }

    /// Enveloppe une erreur de backend
    pub fn backend(err: impl Into<BackendError>) -> Self {
        Self::BackendUnavailable(err.into())
    }

    /// Crée une erreur d'initialisation avec contexte
    pub fn initialization(reason: impl Into<String>, source: Option<BackendError>) -> Self {
        Self::InitializationFailure {
            reason: reason.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
