//! Database connection handling
//!
//! A [`DatabaseConnection`] wraps exactly one physical connection. It is
//! created by the caller and handed to the sync facade; cloning it shares the
//! same connection, and callers queue on it one at a time.

use std::time::Duration;

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Sqlite,
};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::schema::mapper::Dialect;

/// Enumeration of supported database types
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

macro_rules! single_connection_pool {
    ($options:expr, $timeout:expr, $url:expr) => {
        $options
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout($timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect($url)
            .await
            .map_err(|e| Error::ConnectionError(e.to_string()))
    };
}

impl DatabaseConnection {
    /// Open the connection described by the configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        let connection = match Dialect::from_driver(&config.driver) {
            Dialect::Postgres => DatabaseConnection::Postgres(single_connection_pool!(
                PgPoolOptions::new(),
                timeout,
                &config.url
            )?),
            Dialect::MySql => DatabaseConnection::MySql(single_connection_pool!(
                MySqlPoolOptions::new(),
                timeout,
                &config.url
            )?),
            Dialect::Sqlite => DatabaseConnection::Sqlite(single_connection_pool!(
                SqlitePoolOptions::new(),
                timeout,
                &config.url
            )?),
            Dialect::Generic => {
                return Err(Error::ConnectionError(format!(
                    "Unsupported database driver: {}",
                    config.driver
                )))
            }
        };

        tracing::info!(driver = %config.driver, "Database connection established");
        Ok(connection)
    }

    /// SQL dialect spoken by this connection
    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::Postgres(_) => Dialect::Postgres,
            DatabaseConnection::MySql(_) => Dialect::MySql,
            DatabaseConnection::Sqlite(_) => Dialect::Sqlite,
        }
    }

    /// Execute a single SQL statement outside any transaction
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            DatabaseConnection::Postgres(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
            DatabaseConnection::Sqlite(pool) => {
                sqlx::query(sql).execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Close the underlying connection
    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres(pool) => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
            DatabaseConnection::Sqlite(pool) => pool.close().await,
        }
    }
}
