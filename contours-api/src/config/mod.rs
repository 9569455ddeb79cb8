//! Configuration du service

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use contours_core::DEFAULT_MAX_FEATURES;

/// Fichier source publié (la date de mise à jour est lue dans son nom)
pub const DEFAULT_SOURCE_URL: &str =
    "https://contours-bureaux-vote.s3.fr-par.scw.cloud/20251108_contours_bureaux_vote.parquet";

/// Configuration du jeu de données dans PostGIS
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Schéma PostgreSQL
    pub schema: String,

    /// Table des contours
    pub table: String,

    /// URL (ou chemin) du fichier source, pour /api/info
    pub source_url: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            schema: "public".into(),
            table: "contours".into(),
            source_url: DEFAULT_SOURCE_URL.into(),
        }
    }
}

impl DatasetConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            schema: std::env::var("CONTOURS_SCHEMA").unwrap_or(default.schema),
            table: std::env::var("CONTOURS_TABLE").unwrap_or(default.table),
            source_url: std::env::var("CONTOURS_SOURCE_URL").unwrap_or(default.source_url),
        }
    }

    /// Vérifie les identifiants SQL (ils ne peuvent pas être passés en paramètres)
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.schema).context("Invalid dataset schema")?;
        validate_identifier(&self.table).context("Invalid dataset table")?;
        Ok(())
    }

    /// Nom qualifié de la table, prêt à être inséré dans une requête
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Configuration du serveur HTTP
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,

    /// Répertoire des fichiers statiques (index.html, js, css)
    pub static_dir: PathBuf,

    /// Plafond de features par export
    pub max_features: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            static_dir: PathBuf::from("static"),
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl ServerConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        let bind = match std::env::var("CONTOURS_BIND") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid CONTOURS_BIND address: {}", addr))?,
            Err(_) => default.bind,
        };
        let max_features = match std::env::var("CONTOURS_MAX_FEATURES") {
            Ok(max) => max
                .parse()
                .with_context(|| format!("Invalid CONTOURS_MAX_FEATURES: {}", max))?,
            Err(_) => default.max_features,
        };

        Ok(Self {
            bind,
            static_dir: std::env::var("CONTOURS_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.static_dir),
            max_features,
        })
    }
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Valide un identifiant SQL simple (lettres, chiffres, underscore)
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.len() > 63 || !identifier_regex().is_match(name) {
        anyhow::bail!(
            "Invalid SQL identifier: '{}'. Expected [A-Za-z_][A-Za-z0-9_]* (max 63 chars)",
            name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("contours").is_ok());
        assert!(validate_identifier("public").is_ok());
        assert!(validate_identifier("_staging_2024").is_ok());
    }

    #[test]
    fn test_validate_identifier_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1contours").is_err());
        assert!(validate_identifier("contours; DROP TABLE x").is_err());
        assert!(validate_identifier("con-tours").is_err());
        assert!(validate_identifier("\"contours\"").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_qualified_table() {
        let cfg = DatasetConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.qualified_table(), "public.contours");
    }

    #[test]
    fn test_server_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind.port(), 8000);
        assert_eq!(cfg.max_features, 50_000);
    }
}
