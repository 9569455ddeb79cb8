//! Backend PostgreSQL/PostGIS
//!
//! La table des contours est alimentée hors de ce service. Les colonnes gardent
//! le nommage de la publication data.gouv.fr (`"codeDepartement"`, ...), d'où
//! les identifiants entre guillemets.

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use futures::{StreamExt, TryStreamExt};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::debug;

use contours_core::{
    BoundaryFilter, BoundaryRow, BoundarySession, BoundaryStore, CirconscriptionEntry,
    CommuneEntry, ContoursError, DepartementEntry, NameMatching,
};

use crate::config::DatasetConfig;

/// Colonnes lues pour un export (les sept propriétés puis la géométrie en WKB)
const ROW_COLUMNS: &str = r#""codeBureauVote"::text, "numeroBureauVote"::text, "codeCommune"::text, "nomCommune"::text, "codeDepartement"::text, "nomDepartement"::text, "nomCirconscription"::text, ST_AsBinary(geometry)"#;

/// Jeu de données stocké dans PostGIS
#[derive(Clone)]
pub struct PostgisStore {
    pool: Pool,
    table: String,
}

impl PostgisStore {
    /// Le schéma et la table doivent avoir été validés (`DatasetConfig::validate`)
    pub fn new(pool: Pool, dataset: &DatasetConfig) -> Self {
        Self {
            pool,
            table: dataset.qualified_table(),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl BoundaryStore for PostgisStore {
    type Session = PostgisSession;

    async fn open_session(&self) -> Result<PostgisSession, ContoursError> {
        let client = self.pool.get().await.map_err(ContoursError::backend)?;
        Ok(PostgisSession {
            client,
            table: self.table.clone(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "postgis"
    }
}

/// Connexion empruntée au pool pour la durée d'une requête
pub struct PostgisSession {
    client: Object,
    table: String,
}

/// Clause WHERE et paramètres liés d'un filtre
fn where_clause(filter: &BoundaryFilter) -> (&'static str, Vec<&(dyn ToSql + Sync)>) {
    match filter {
        BoundaryFilter::Departement { code } => {
            (r#""codeDepartement" = $1"#, vec![code as &(dyn ToSql + Sync)])
        }
        BoundaryFilter::Commune { code } => {
            (r#""codeCommune" = $1"#, vec![code as &(dyn ToSql + Sync)])
        }
        BoundaryFilter::Circonscription {
            name,
            departement,
            matching: NameMatching::Exact,
        } => (
            r#""nomCirconscription" = $1 AND "nomDepartement" = $2"#,
            vec![name as &(dyn ToSql + Sync), departement],
        ),
        BoundaryFilter::Circonscription {
            name,
            departement,
            matching: NameMatching::CaseInsensitive,
        } => (
            r#"lower("nomCirconscription") = lower($1) AND lower("nomDepartement") = lower($2)"#,
            vec![name as &(dyn ToSql + Sync), departement],
        ),
    }
}

fn count_sql(table: &str, predicate: &str) -> String {
    format!("SELECT COUNT(*) FROM {} WHERE {}", table, predicate)
}

/// `limit_param` est le numéro du paramètre lié portant la limite
fn fetch_sql(table: &str, predicate: &str, limit_param: usize) -> String {
    format!(
        r#"SELECT {} FROM {} WHERE {} ORDER BY "codeBureauVote" LIMIT ${}"#,
        ROW_COLUMNS, table, predicate, limit_param
    )
}

fn text(row: &Row, idx: usize) -> Result<String, ContoursError> {
    let value: Option<String> = row.try_get(idx).map_err(ContoursError::backend)?;
    Ok(value.unwrap_or_default())
}

fn boundary_row(row: &Row) -> Result<BoundaryRow, ContoursError> {
    Ok(BoundaryRow {
        code_bureau_vote: text(row, 0)?,
        numero_bureau_vote: text(row, 1)?,
        code_commune: text(row, 2)?,
        nom_commune: text(row, 3)?,
        code_departement: text(row, 4)?,
        nom_departement: text(row, 5)?,
        nom_circonscription: text(row, 6)?,
        geometry: row.try_get(7).map_err(ContoursError::backend)?,
    })
}

fn departement_entry(row: &Row) -> Result<DepartementEntry, ContoursError> {
    Ok(DepartementEntry {
        code: text(row, 0)?,
        name: text(row, 1)?,
    })
}

fn circonscription_entry(row: &Row) -> Result<CirconscriptionEntry, ContoursError> {
    Ok(CirconscriptionEntry {
        name: text(row, 0)?,
        departement: text(row, 1)?,
    })
}

fn commune_entry(row: &Row) -> Result<CommuneEntry, ContoursError> {
    Ok(CommuneEntry {
        code: text(row, 0)?,
        name: text(row, 1)?,
        departement: text(row, 2)?,
    })
}

impl PostgisSession {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, ContoursError> {
        self.client
            .query(sql, &[])
            .await
            .map_err(ContoursError::backend)
    }
}

#[async_trait]
impl BoundarySession for PostgisSession {
    async fn count(&self, filter: &BoundaryFilter) -> Result<u64, ContoursError> {
        let (predicate, params) = where_clause(filter);
        let sql = count_sql(&self.table, predicate);
        let stmt = self
            .client
            .prepare_cached(&sql)
            .await
            .map_err(ContoursError::backend)?;

        let row = self
            .client
            .query_one(&stmt, &params)
            .await
            .map_err(ContoursError::backend)?;
        let count: i64 = row.try_get(0).map_err(ContoursError::backend)?;
        Ok(count.max(0) as u64)
    }

    async fn fetch(
        &self,
        filter: &BoundaryFilter,
        limit: u64,
    ) -> Result<Vec<BoundaryRow>, ContoursError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let (predicate, mut params) = where_clause(filter);
        params.push(&limit);
        let sql = fetch_sql(&self.table, predicate, params.len());
        let stmt = self
            .client
            .prepare_cached(&sql)
            .await
            .map_err(ContoursError::backend)?;

        let rows: Vec<BoundaryRow> = self
            .client
            .query_raw(&stmt, params)
            .await
            .map_err(ContoursError::backend)?
            .map(|row| row.map_err(ContoursError::backend).and_then(|r| boundary_row(&r)))
            .try_collect()
            .await?;

        debug!(rows = rows.len(), kind = filter.kind(), "Fetched rows from PostGIS");
        Ok(rows)
    }

    async fn departements(&self) -> Result<Vec<DepartementEntry>, ContoursError> {
        let sql = format!(
            r#"SELECT DISTINCT "codeDepartement"::text AS code, "nomDepartement"::text AS name
               FROM {} ORDER BY name, code"#,
            self.table
        );
        self.query(&sql)
            .await?
            .iter()
            .map(departement_entry)
            .collect()
    }

    async fn circonscriptions(&self) -> Result<Vec<CirconscriptionEntry>, ContoursError> {
        let sql = format!(
            r#"SELECT DISTINCT "nomCirconscription"::text AS name, "nomDepartement"::text AS departement
               FROM {} ORDER BY name, departement"#,
            self.table
        );
        self.query(&sql)
            .await?
            .iter()
            .map(circonscription_entry)
            .collect()
    }

    async fn communes(&self) -> Result<Vec<CommuneEntry>, ContoursError> {
        let sql = format!(
            r#"SELECT DISTINCT "codeCommune"::text AS code, "nomCommune"::text AS name, "nomDepartement"::text AS departement
               FROM {} ORDER BY name, code"#,
            self.table
        );
        self.query(&sql)
            .await?
            .iter()
            .map(commune_entry)
            .collect()
    }
}
