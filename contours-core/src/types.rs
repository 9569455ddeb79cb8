//! Types de données pour le crate contours-core

use serde::Serialize;

/// Un département (unique par code)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartementEntry {
    /// Code INSEE du département ("01", "2A", "974", ...)
    pub code: String,

    /// Nom affiché
    pub name: String,
}

/// Une circonscription législative
///
/// Les noms se répètent d'un département à l'autre ("1ère circonscription"),
/// l'unicité porte donc sur le couple (nom, département).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CirconscriptionEntry {
    pub name: String,

    /// Nom du département
    pub departement: String,
}

/// Une commune (unique par code INSEE)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommuneEntry {
    pub code: String,
    pub name: String,

    /// Nom du département
    pub departement: String,
}

/// Un contour de bureau de vote tel que renvoyé par le backend
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRow {
    pub code_bureau_vote: String,
    pub numero_bureau_vote: String,
    pub code_commune: String,
    pub nom_commune: String,
    pub code_departement: String,
    pub nom_departement: String,
    pub nom_circonscription: String,

    /// Géométrie encodée en WKB (absente si la source n'en a pas)
    pub geometry: Option<Vec<u8>>,
}

impl BoundaryRow {
    /// Propriétés exportées dans le GeoJSON (jamais la ligne complète)
    pub fn properties(&self) -> BoundaryProperties<'_> {
        BoundaryProperties {
            code_bureau_vote: &self.code_bureau_vote,
            numero_bureau_vote: &self.numero_bureau_vote,
            code_commune: &self.code_commune,
            nom_commune: &self.nom_commune,
            code_departement: &self.code_departement,
            nom_departement: &self.nom_departement,
            nom_circonscription: &self.nom_circonscription,
        }
    }
}

/// Les sept propriétés publiées pour chaque feature
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryProperties<'a> {
    pub code_bureau_vote: &'a str,
    pub numero_bureau_vote: &'a str,
    pub code_commune: &'a str,
    pub nom_commune: &'a str,
    pub code_departement: &'a str,
    pub nom_departement: &'a str,
    pub nom_circonscription: &'a str,
}

/// Mode de comparaison pour la recherche de circonscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatching {
    /// Égalité stricte
    Exact,
    /// Égalité insensible à la casse
    CaseInsensitive,
}

/// Filtre d'export
///
/// Les valeurs sont toujours passées en paramètres liés par les backends,
/// jamais concaténées dans le texte de la requête.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryFilter {
    /// Tous les bureaux d'un département (par code)
    Departement { code: String },

    /// Tous les bureaux d'une circonscription (nom + nom du département)
    Circonscription {
        name: String,
        departement: String,
        matching: NameMatching,
    },

    /// Tous les bureaux d'une commune (par code INSEE)
    Commune { code: String },
}

impl BoundaryFilter {
    /// Libellé de la catégorie, utilisé dans les erreurs et les logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Departement { .. } => "Department",
            Self::Circonscription { .. } => "Circonscription",
            Self::Commune { .. } => "Commune",
        }
    }

    /// Indique si une ligne satisfait le filtre
    pub fn matches(&self, row: &BoundaryRow) -> bool {
        match self {
            Self::Departement { code } => row.code_departement == *code,
            Self::Commune { code } => row.code_commune == *code,
            Self::Circonscription {
                name,
                departement,
                matching: NameMatching::Exact,
            } => row.nom_circonscription == *name && row.nom_departement == *departement,
            Self::Circonscription {
                name,
                departement,
                matching: NameMatching::CaseInsensitive,
            } => {
                row.nom_circonscription.to_lowercase() == name.to_lowercase()
                    && row.nom_departement.to_lowercase() == departement.to_lowercase()
            }
        }
    }
}
