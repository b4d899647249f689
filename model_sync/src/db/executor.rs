//! Migration executor
//!
//! Applies a batch of DDL statements inside one transaction.

use sqlx::Executor;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};

/// Runs DDL batches with all-or-nothing semantics.
///
/// On dialects with transactional DDL (postgres, sqlite) a failed batch leaves
/// no trace. MySQL commits every DDL statement implicitly, so there a failure
/// only stops the remaining statements: everything before the failing
/// statement stays applied.
#[derive(Debug, Clone)]
pub struct MigrationExecutor {
    connection: DatabaseConnection,
}

macro_rules! apply_in_transaction {
    ($pool:expr, $statements:expr) => {{
        let mut tx = $pool.begin().await?;
        let mut failure = None;

        for (index, statement) in $statements.iter().enumerate() {
            tracing::debug!(position = index + 1, sql = %statement, "Executing statement");
            if let Err(source) = (&mut *tx).execute(statement.as_str()).await {
                failure = Some(Error::ExecutionError {
                    statement: statement.clone(),
                    position: index + 1,
                    source,
                });
                break;
            }
        }

        match failure {
            Some(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    tracing::error!(error = %rollback_error, "Rollback failed");
                }
                Err(error)
            }
            None => {
                tx.commit().await?;
                Ok(())
            }
        }
    }};
}

impl MigrationExecutor {
    /// Create a new executor on the shared connection
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Apply `statements` in order. Commits once if all succeed; otherwise
    /// rolls back and returns the first failure.
    pub async fn apply(&self, statements: &[String]) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }

        let dialect = self.connection.dialect();
        if !dialect.supports_transactional_ddl() {
            tracing::warn!(
                %dialect,
                "Dialect commits DDL implicitly; a failure will not undo earlier statements"
            );
        }

        tracing::info!(statements = statements.len(), "Applying migration batch");

        let result = match &self.connection {
            DatabaseConnection::Postgres(pool) => apply_in_transaction!(pool, statements),
            DatabaseConnection::MySql(pool) => apply_in_transaction!(pool, statements),
            DatabaseConnection::Sqlite(pool) => apply_in_transaction!(pool, statements),
        };

        match &result {
            Ok(()) => tracing::info!("Migration batch committed"),
            Err(error) => tracing::error!(%error, "Migration batch rolled back"),
        }
        result
    }

    /// Get database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
