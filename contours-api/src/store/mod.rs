//! Backends de données du service

pub mod pool;
pub mod postgis;

pub use pool::{create_pool, test_connection, DatabaseConfig, SslMode};
pub use postgis::PostgisStore;
