//! Handlers HTTP

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use contours_core::{
    strip_accents, BoundaryStore, FeatureCollectionDocument, SearchResults, SearchScope,
};

use super::{ApiError, AppState};
use crate::info::DatasetInfo;

const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";

/// Paramètres de /search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,

    /// all (défaut), departement, circonscription, commune
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET /api
pub async fn api_root() -> Json<Value> {
    Json(json!({
        "name": "Contours Bureaux de Vote API",
        "endpoints": {
            "/search": "Search departments, circonscriptions, or communes",
            "/download/departement/{code}": "Download GeoJSON for a department",
            "/download/circonscription/{departement}/{name}": "Download GeoJSON for a circonscription",
            "/download/commune/{code}": "Download GeoJSON for a commune",
            "/api/info": "Dataset metadata",
        }
    }))
}

/// GET /api/info
pub async fn info<S: BoundaryStore>(State(state): State<AppState<S>>) -> Json<DatasetInfo> {
    Json(state.info.as_ref().clone())
}

/// GET /search?q=...&type=...
///
/// Un type inconnu ne sélectionne aucune catégorie: trois listes vides.
pub async fn search<S: BoundaryStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResults> {
    let scope = match params.kind.as_deref() {
        None => Ok(SearchScope::All),
        Some(kind) => kind.parse::<SearchScope>(),
    };

    match scope {
        Ok(scope) => Json(state.index.search(&params.q, scope)),
        Err(reason) => {
            debug!(%reason, "Ignoring search with unknown type");
            Json(SearchResults::default())
        }
    }
}

/// GET /download/departement/{code}
pub async fn download_departement<S: BoundaryStore>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let doc = state.materializer.departement(&code).await?;
    Ok(geojson_response(format!("departement_{}", filename_part(&code)), doc))
}

/// GET /download/circonscription/{departement}/{name}
pub async fn download_circonscription<S: BoundaryStore>(
    State(state): State<AppState<S>>,
    Path((departement, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let doc = state
        .materializer
        .circonscription(&departement, &name)
        .await?;
    Ok(geojson_response(
        format!(
            "circonscription_{}_{}",
            filename_part(&departement),
            filename_part(&name)
        ),
        doc,
    ))
}

/// GET /download/commune/{code}
pub async fn download_commune<S: BoundaryStore>(
    State(state): State<AppState<S>>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let doc = state.materializer.commune(&code).await?;
    Ok(geojson_response(format!("commune_{}", filename_part(&code)), doc))
}

fn geojson_response(basename: String, doc: FeatureCollectionDocument) -> Response {
    debug!(file = %basename, features = doc.feature_count(), "Sending GeoJSON");
    (
        [
            (header::CONTENT_TYPE, GEOJSON_MEDIA_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}.geojson", basename),
            ),
        ],
        doc.into_bytes(),
    )
        .into_response()
}

/// Réduit un libellé à des caractères sûrs pour un nom de fichier
fn filename_part(value: &str) -> String {
    strip_accents(value)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
