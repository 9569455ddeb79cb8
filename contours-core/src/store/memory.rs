//! Backend en mémoire
//!
//! Sert pour les tests et pour un service hors ligne alimenté par un fichier
//! GeoJSON local (le même format que la publication data.gouv.fr).

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use geojson::{Feature, GeoJson};
use serde_json::Value;
use tracing::{debug, info};
use wkb::geom_to_wkb;

use super::{BoundarySession, BoundaryStore};
use crate::error::ContoursError;
use crate::types::{BoundaryFilter, BoundaryRow, CirconscriptionEntry, CommuneEntry, DepartementEntry};

/// Jeu de données chargé en mémoire
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Vec<BoundaryRow>>,
    fetched: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new(rows: Vec<BoundaryRow>) -> Self {
        Self {
            rows: Arc::new(rows),
            fetched: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Charge une FeatureCollection GeoJSON
    ///
    /// Chaque feature doit porter les sept propriétés d'un bureau de vote.
    /// Les valeurs numériques sont converties en texte.
    pub fn from_geojson(text: &str) -> Result<Self, ContoursError> {
        let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| {
            ContoursError::initialization("Invalid GeoJSON document", Some(e.into()))
        })?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(ContoursError::initialization(
                    "Expected a GeoJSON FeatureCollection",
                    None,
                ))
            }
        };

        let rows = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| row_from_feature(i, feature))
            .collect::<Result<Vec<_>, _>>()?;

        info!(rows = rows.len(), "Loaded in-memory dataset");
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Nombre total de lignes renvoyées par `fetch` depuis la création
    pub fn fetched_rows(&self) -> u64 {
        self.fetched.load(Ordering::Relaxed)
    }
}

fn row_from_feature(index: usize, feature: Feature) -> Result<BoundaryRow, ContoursError> {
    let text = |key: &str| -> Result<String, ContoursError> {
        match feature.property(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Null) | None => Err(ContoursError::initialization(
                format!("Feature #{index}: missing property {key}"),
                None,
            )),
            Some(other) => Ok(other.to_string()),
        }
    };

    let row = BoundaryRow {
        code_bureau_vote: text("codeBureauVote")?,
        numero_bureau_vote: text("numeroBureauVote")?,
        code_commune: text("codeCommune")?,
        nom_commune: text("nomCommune")?,
        code_departement: text("codeDepartement")?,
        nom_departement: text("nomDepartement")?,
        nom_circonscription: text("nomCirconscription")?,
        geometry: None,
    };

    let geometry = match feature.geometry {
        Some(geometry) => {
            let geom = geo::Geometry::<f64>::try_from(geometry).map_err(|e| {
                ContoursError::initialization(
                    format!("Feature #{index}: unsupported geometry"),
                    Some(e.into()),
                )
            })?;
            let wkb = geom_to_wkb(&geom).map_err(|e| {
                ContoursError::initialization(
                    format!("Feature #{index}: failed to encode geometry to WKB: {e:?}"),
                    None,
                )
            })?;
            Some(wkb)
        }
        None => None,
    };

    Ok(BoundaryRow { geometry, ..row })
}

#[async_trait]
impl BoundaryStore for MemoryStore {
    type Session = MemorySession;

    async fn open_session(&self) -> Result<MemorySession, ContoursError> {
        Ok(MemorySession {
            rows: Arc::clone(&self.rows),
            fetched: Arc::clone(&self.fetched),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Session sur un [`MemoryStore`] (simple copie des pointeurs partagés)
#[derive(Debug)]
pub struct MemorySession {
    rows: Arc<Vec<BoundaryRow>>,
    fetched: Arc<AtomicU64>,
}

#[async_trait]
impl BoundarySession for MemorySession {
    async fn count(&self, filter: &BoundaryFilter) -> Result<u64, ContoursError> {
        Ok(self.rows.iter().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn fetch(
        &self,
        filter: &BoundaryFilter,
        limit: u64,
    ) -> Result<Vec<BoundaryRow>, ContoursError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let rows: Vec<BoundaryRow> = self
            .rows
            .iter()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect();
        self.fetched.fetch_add(rows.len() as u64, Ordering::Relaxed);
        debug!(rows = rows.len(), kind = filter.kind(), "Fetched rows from memory");
        Ok(rows)
    }

    async fn departements(&self) -> Result<Vec<DepartementEntry>, ContoursError> {
        let by_code: BTreeMap<&str, &str> = self
            .rows
            .iter()
            .map(|r| (r.code_departement.as_str(), r.nom_departement.as_str()))
            .collect();

        let mut entries: Vec<DepartementEntry> = by_code
            .into_iter()
            .map(|(code, name)| DepartementEntry {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(entries)
    }

    async fn circonscriptions(&self) -> Result<Vec<CirconscriptionEntry>, ContoursError> {
        // BTreeSet trie déjà par (nom, département)
        let distinct: BTreeSet<(&str, &str)> = self
            .rows
            .iter()
            .map(|r| (r.nom_circonscription.as_str(), r.nom_departement.as_str()))
            .collect();

        Ok(distinct
            .into_iter()
            .map(|(name, departement)| CirconscriptionEntry {
                name: name.to_string(),
                departement: departement.to_string(),
            })
            .collect())
    }

    async fn communes(&self) -> Result<Vec<CommuneEntry>, ContoursError> {
        let by_code: BTreeMap<&str, (&str, &str)> = self
            .rows
            .iter()
            .map(|r| {
                (
                    r.code_commune.as_str(),
                    (r.nom_commune.as_str(), r.nom_departement.as_str()),
                )
            })
            .collect();

        let mut entries: Vec<CommuneEntry> = by_code
            .into_iter()
            .map(|(code, (name, departement))| CommuneEntry {
                code: code.to_string(),
                name: name.to_string(),
                departement: departement.to_string(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(entries)
    }
}
