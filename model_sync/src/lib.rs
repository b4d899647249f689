//! model_sync: declarative schema synchronization
//!
//! A client describes the tables it wants; model_sync compares that
//! description with the live database and applies the missing tables and
//! columns, plus column redefinitions, as one transaction. Nothing is ever
//! dropped.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod sync;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::executor::MigrationExecutor;
pub use error::{Error, Result};
pub use schema::analyzer::SchemaAnalyzer;
pub use schema::definition::SchemaDefinition;
pub use schema::diff::{Change, SchemaDiff};
pub use schema::generator::MigrationGenerator;
pub use schema::mapper::Dialect;
pub use schema::types::Schema;
pub use sync::SyncService;

/// Initialize model_sync with the specified configuration file
pub async fn init(config_path: &str) -> Result<SyncService> {
    let config = config::load_from_file(config_path)?;
    connect(config).await
}

/// Set up logging and open the connection described by `config`
pub async fn connect(config: Config) -> Result<SyncService> {
    utils::logging::init_logging(&config.logging)?;
    let connection = DatabaseConnection::connect(&config.database).await?;
    Ok(SyncService::new(connection, config.sync))
}
