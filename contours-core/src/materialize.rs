//! Export GeoJSON borné
//!
//! Le nombre de lignes est vérifié avant toute lecture de géométrie: un export
//! au-delà du plafond échoue sans rien matérialiser.

use tracing::{debug, info};

use crate::error::ContoursError;
use crate::export::write_feature_collection;
use crate::store::{BoundarySession, BoundaryStore};
use crate::text::compose;
use crate::types::{BoundaryFilter, NameMatching};

/// Plafond par défaut du nombre de features par export
pub const DEFAULT_MAX_FEATURES: u64 = 50_000;

/// Document GeoJSON `FeatureCollection` prêt à être servi
#[derive(Debug, Clone)]
pub struct FeatureCollectionDocument {
    feature_count: usize,
    body: Vec<u8>,
}

impl FeatureCollectionDocument {
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// Transforme un filtre en FeatureCollection
#[derive(Debug, Clone)]
pub struct Materializer<S> {
    store: S,
    max_features: u64,
}

impl<S: BoundaryStore> Materializer<S> {
    pub fn new(store: S) -> Self {
        Self::with_max_features(store, DEFAULT_MAX_FEATURES)
    }

    pub fn with_max_features(store: S, max_features: u64) -> Self {
        Self {
            store,
            max_features,
        }
    }

    pub fn max_features(&self) -> u64 {
        self.max_features
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Export d'un département
    pub async fn departement(&self, code: &str) -> Result<FeatureCollectionDocument, ContoursError> {
        self.materialize(&BoundaryFilter::Departement {
            code: code.to_string(),
        })
        .await
    }

    /// Export d'une commune
    pub async fn commune(&self, code: &str) -> Result<FeatureCollectionDocument, ContoursError> {
        self.materialize(&BoundaryFilter::Commune {
            code: code.to_string(),
        })
        .await
    }

    /// Export d'une circonscription
    ///
    /// Les deux noms sont d'abord ramenés en forme composée (NFC). Si
    /// l'égalité stricte ne trouve rien, une seconde tentative compare sans
    /// tenir compte de la casse. Un dépassement de plafond au premier essai
    /// est renvoyé tel quel.
    pub async fn circonscription(
        &self,
        departement: &str,
        name: &str,
    ) -> Result<FeatureCollectionDocument, ContoursError> {
        let name = compose(name);
        let departement = compose(departement);

        let exact = BoundaryFilter::Circonscription {
            name: name.clone(),
            departement: departement.clone(),
            matching: NameMatching::Exact,
        };

        match self.materialize(&exact).await {
            Err(err) if err.is_not_found() => {
                debug!(%name, %departement, "Exact match failed, retrying case-insensitive");
                self.materialize(&BoundaryFilter::Circonscription {
                    name,
                    departement,
                    matching: NameMatching::CaseInsensitive,
                })
                .await
            }
            other => other,
        }
    }

    /// Compte, vérifie le plafond, puis lit et assemble les features
    pub async fn materialize(
        &self,
        filter: &BoundaryFilter,
    ) -> Result<FeatureCollectionDocument, ContoursError> {
        let session = self.store.open_session().await?;

        let count = session.count(filter).await?;
        debug!(kind = filter.kind(), count, "Counted matching rows");

        if count == 0 {
            return Err(ContoursError::not_found(filter.kind()));
        }
        if count > self.max_features {
            return Err(self.refuse(filter, count));
        }

        // Le jeu peut être rechargé entre les deux requêtes: la lecture est
        // bornée à une ligne de plus que le plafond, puis revérifiée.
        let rows = session
            .fetch(filter, self.max_features.saturating_add(1))
            .await?;
        if rows.is_empty() {
            return Err(ContoursError::not_found(filter.kind()));
        }
        if rows.len() as u64 > self.max_features {
            return Err(self.refuse(filter, rows.len() as u64));
        }

        let mut body = Vec::with_capacity(rows.len() * 1024);
        write_feature_collection(&mut body, &rows)?;

        debug!(
            kind = filter.kind(),
            features = rows.len(),
            bytes = body.len(),
            "FeatureCollection materialized"
        );

        Ok(FeatureCollectionDocument {
            feature_count: rows.len(),
            body,
        })
    }
}

impl<S> Materializer<S> {
    fn refuse(&self, filter: &BoundaryFilter, count: u64) -> ContoursError {
        info!(
            kind = filter.kind(),
            count,
            max = self.max_features,
            "Export refused, too many features"
        );
        ContoursError::SizeExceeded {
            count,
            max: self.max_features,
        }
    }
}
