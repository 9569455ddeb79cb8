//! Métadonnées du jeu de données exposées par /api/info

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Attribution de la source
pub const SOURCE: &str =
    "Proposition de contours des bureaux de vote, data.gouv.fr (Licence Ouverte Etalab 2.0)";

/// Page du jeu de données d'origine
pub const SOURCE_PAGE: &str =
    "https://www.data.gouv.fr/fr/datasets/proposition-de-contours-des-bureaux-de-vote/";

/// Méthode de construction des contours
pub const METHOD: &str = "Contours reconstitués à partir des adresses du Répertoire électoral unique \
    (REU) géolocalisées, agrégées par bureau de vote. Il s'agit d'une proposition: les contours \
    n'ont pas de valeur réglementaire.";

/// Informations servies par /api/info
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    /// Date de mise à jour (YYYY-MM-DD), lue dans le nom du fichier source
    pub last_update: Option<String>,
    pub source: &'static str,
    pub source_page: &'static str,
    pub source_url: String,
    pub method: &'static str,
}

impl DatasetInfo {
    pub fn from_source(source_url: &str) -> Self {
        Self {
            last_update: parse_date_tag(source_url),
            source: SOURCE,
            source_page: SOURCE_PAGE,
            source_url: source_url.to_string(),
            method: METHOD,
        }
    }
}

fn date_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[/_-])(\d{4})(\d{2})(\d{2})_[^/]*$").expect("valid date tag regex")
    })
}

/// Extrait la date `YYYYMMDD_` en tête du nom de fichier
///
/// `.../20251108_contours_bureaux_vote.parquet` donne `2025-11-08`.
pub fn parse_date_tag(source: &str) -> Option<String> {
    let caps = date_tag_regex().captures(source)?;
    let (year, month, day) = (&caps[1], &caps[2], &caps[3]);

    let m: u32 = month.parse().ok()?;
    let d: u32 = day.parse().ok()?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }

    Some(format!("{}-{}-{}", year, month, day))
}
