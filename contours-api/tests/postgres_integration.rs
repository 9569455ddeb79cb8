//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL/PostGIS disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! # Avec PostgreSQL local
//! cargo test --test postgres_integration -- --ignored
//!
//! # Avec Docker
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test cargo test --test postgres_integration -- --ignored
//! ```

use anyhow::Result;
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;

use contours_api::{create_pool, DatabaseConfig, DatasetConfig, PostgisStore};
use contours_core::{
    BoundaryFilter, BoundarySession, BoundaryStore, ContoursError, Materializer, NameMatching,
    SearchIndex, SearchScope,
};

const SCHEMA: &str = "contours_test";

/// Configuration de test
fn test_config() -> Config {
    let mut cfg = Config::new();
    cfg.host = Some(std::env::var("PGHOST").unwrap_or_else(|_| "localhost".into()));
    cfg.port = Some(
        std::env::var("PGPORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432),
    );
    cfg.dbname = Some(std::env::var("PGDATABASE").unwrap_or_else(|_| "contours_test".into()));
    cfg.user = Some(std::env::var("PGUSER").unwrap_or_else(|_| "postgres".into()));
    cfg.password = std::env::var("PGPASSWORD").ok();
    cfg
}

/// Pool en écriture pour préparer les données
async fn create_admin_pool() -> Result<Pool> {
    let cfg = test_config();
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(pool)
}

/// Store en lecture seule, tel qu'utilisé par le service
async fn create_test_store() -> Result<PostgisStore> {
    let mut db = DatabaseConfig::from_env();
    if std::env::var("PGDATABASE").is_err() {
        db.dbname = "contours_test".into();
    }
    let pool = create_pool(&db).await?;
    let dataset = DatasetConfig {
        schema: SCHEMA.into(),
        table: "contours".into(),
        ..Default::default()
    };
    Ok(PostgisStore::new(pool, &dataset))
}

/// Crée la table des contours avec un petit jeu de données
async fn setup_test_dataset(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            r#"
            CREATE EXTENSION IF NOT EXISTS postgis;

            DROP SCHEMA IF EXISTS contours_test CASCADE;
            CREATE SCHEMA contours_test;

            CREATE TABLE contours_test.contours (
                "codeBureauVote" TEXT NOT NULL,
                "numeroBureauVote" TEXT,
                "codeCommune" TEXT NOT NULL,
                "nomCommune" TEXT NOT NULL,
                "codeDepartement" TEXT NOT NULL,
                "nomDepartement" TEXT NOT NULL,
                "nomCirconscription" TEXT NOT NULL,
                geometry geometry(Geometry, 4326)
            );
            "#,
        )
        .await?;

    let insert = client
        .prepare(
            r#"
            INSERT INTO contours_test.contours
                ("codeBureauVote", "numeroBureauVote", "codeCommune", "nomCommune",
                 "codeDepartement", "nomDepartement", "nomCirconscription", geometry)
            VALUES ($1, $2, $3, $4, $5, $6, $7, ST_GeomFromText($8, 4326))
            "#,
        )
        .await?;

    for i in 1..=12 {
        let (code_commune, nom_commune, code_dep, nom_dep, circo) = if i <= 8 {
            ("75056", "Paris", "75", "Paris", "1ère circonscription")
        } else {
            (
                "54231",
                "Fléville-devant-Nancy",
                "54",
                "Meurthe-et-Moselle",
                "1ère circonscription",
            )
        };
        let code_bureau = format!("{}_{:04}", code_commune, i);
        let numero = format!("{:04}", i);
        let x = 2.0 + i as f64 * 0.01;
        let wkt = format!(
            "POLYGON(({x} 48,{x1} 48,{x1} 48.01,{x} 48.01,{x} 48))",
            x = x,
            x1 = x + 0.01
        );

        client
            .execute(
                &insert,
                &[
                    &code_bureau,
                    &numero,
                    &code_commune,
                    &nom_commune,
                    &code_dep,
                    &nom_dep,
                    &circo,
                    &wkt,
                ],
            )
            .await?;
    }

    Ok(())
}

/// Test de connexion basique
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_database_connection() {
    let store = create_test_store().await.expect("Failed to create store");
    contours_api::store::test_connection(store.pool())
        .await
        .expect("Connection test failed");
}

/// Les projections distinctes alimentent l'index
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_search_index_from_postgis() {
    let admin = create_admin_pool().await.expect("Failed to create pool");
    setup_test_dataset(&admin).await.expect("Failed to setup dataset");

    let store = create_test_store().await.expect("Failed to create store");
    let index = SearchIndex::build(&store).await.expect("Failed to build index");

    let deps: Vec<&str> = index.departements().map(|d| d.code.as_str()).collect();
    assert_eq!(deps, vec!["54", "75"]);
    assert_eq!(index.circonscriptions().count(), 2);
    assert_eq!(index.communes().count(), 2);

    let results = index.search("fleville", SearchScope::Commune);
    assert_eq!(results.communes.len(), 1);
    assert_eq!(results.communes[0].code, "54231");
}

/// Comptage et lecture avec paramètres liés
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_count_and_fetch() {
    let admin = create_admin_pool().await.expect("Failed to create pool");
    setup_test_dataset(&admin).await.expect("Failed to setup dataset");

    let store = create_test_store().await.expect("Failed to create store");
    let session = store.open_session().await.expect("Failed to open session");

    let filter = BoundaryFilter::Departement { code: "75".into() };
    assert_eq!(session.count(&filter).await.unwrap(), 8);

    let rows = session.fetch(&filter, 100).await.unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.code_departement == "75"));
    assert!(rows.iter().all(|r| r.geometry.is_some()));

    let limited = session.fetch(&filter, 3).await.unwrap();
    assert_eq!(limited.len(), 3);
    assert_eq!(limited[0].code_bureau_vote, rows[0].code_bureau_vote);

    // Une valeur piégée reste une simple valeur
    let hostile = BoundaryFilter::Departement {
        code: "75' OR '1'='1".into(),
    };
    assert_eq!(session.count(&hostile).await.unwrap(), 0);

    let relaxed = BoundaryFilter::Circonscription {
        name: "1ÈRE CIRCONSCRIPTION".into(),
        departement: "PARIS".into(),
        matching: NameMatching::CaseInsensitive,
    };
    assert_eq!(session.count(&relaxed).await.unwrap(), 8);
}

/// Export complet, plafond et repli de casse
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_materialize_from_postgis() {
    let admin = create_admin_pool().await.expect("Failed to create pool");
    setup_test_dataset(&admin).await.expect("Failed to setup dataset");

    let store = create_test_store().await.expect("Failed to create store");

    let materializer = Materializer::new(store.clone());
    let doc = materializer.commune("54231").await.expect("Export failed");
    assert_eq!(doc.feature_count(), 4);

    let json: serde_json::Value = serde_json::from_slice(doc.as_bytes()).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);
    assert_eq!(features[0]["geometry"]["type"], "Polygon");
    assert_eq!(features[0]["properties"]["codeCommune"], "54231");

    let doc = materializer
        .circonscription("paris", "1ère Circonscription")
        .await
        .expect("Case-insensitive retry failed");
    assert_eq!(doc.feature_count(), 8);

    let capped = Materializer::with_max_features(store, 5);
    let err = capped.departement("75").await.unwrap_err();
    assert!(matches!(err, ContoursError::SizeExceeded { count: 8, max: 5 }));
}

/// Les sessions du service sont en lecture seule
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_sessions_are_read_only() {
    let admin = create_admin_pool().await.expect("Failed to create pool");
    setup_test_dataset(&admin).await.expect("Failed to setup dataset");

    let store = create_test_store().await.expect("Failed to create store");
    let client = store.pool().get().await.expect("Failed to get client");

    let result = client
        .execute("DELETE FROM contours_test.contours", &[])
        .await;
    assert!(result.is_err(), "write should fail on a read-only session");
}
