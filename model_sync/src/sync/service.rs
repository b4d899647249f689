//! Sync facade
//!
//! Orchestrates introspection, diffing, DDL generation and execution on one
//! injected connection.

use crate::config::SyncConfig;
use crate::db::connection::DatabaseConnection;
use crate::db::executor::MigrationExecutor;
use crate::error::Result;
use crate::schema::analyzer::SchemaAnalyzer;
use crate::schema::definition::SchemaDefinition;
use crate::schema::diff::{Change, SchemaDiff};
use crate::schema::generator::MigrationGenerator;
use crate::schema::types::Schema;
use crate::sync::records::{
    changes_from_records, ApplyRequest, ApplyResponse, ChangeRecord, DiffRequest, DiffResponse,
};

/// Entry point for the boundary layer
#[derive(Debug, Clone)]
pub struct SyncService {
    analyzer: SchemaAnalyzer,
    generator: MigrationGenerator,
    executor: MigrationExecutor,
    config: SyncConfig,
}

impl SyncService {
    /// Create a service on a connection owned by the caller
    pub fn new(connection: DatabaseConnection, config: SyncConfig) -> Self {
        Self {
            analyzer: SchemaAnalyzer::new(connection.clone()),
            generator: MigrationGenerator::new(connection.dialect()),
            executor: MigrationExecutor::new(connection),
            config,
        }
    }

    /// Read the live schema
    pub async fn current_schema(&self) -> Result<Schema> {
        self.analyzer.current_schema().await
    }

    /// Diff the live database against a definition
    pub async fn diff(&self, definition: &SchemaDefinition) -> Result<SchemaDiff> {
        let desired = Schema::from_definition(definition)?;
        let current = self.current_schema().await?;
        let diff = SchemaDiff::generate(&current, &desired);

        tracing::info!(changes = diff.len(), "Schema diff computed");
        Ok(diff)
    }

    /// Diff and render the result for transport
    pub async fn diff_request(&self, request: &DiffRequest) -> Result<DiffResponse> {
        let diff = self.diff(request).await?;

        Ok(DiffResponse {
            status: "diff".to_string(),
            current_version: self.config.current_version.clone(),
            new_version: request
                .version
                .clone()
                .unwrap_or_else(|| self.config.default_version.clone()),
            changes: diff.changes().iter().map(ChangeRecord::from).collect(),
        })
    }

    /// Statements `apply_migration` would run for these changes
    pub fn plan(&self, changes: &[Change]) -> Vec<String> {
        self.generator.generate_all(changes)
    }

    /// Apply the changes as one batch. Returns `true` once committed.
    pub async fn apply_migration(&self, changes: &[Change]) -> Result<bool> {
        let statements = self.plan(changes);
        for statement in &statements {
            tracing::debug!(sql = %statement, "Planned statement");
        }

        self.executor.apply(&statements).await?;
        Ok(true)
    }

    /// Convert, apply and render the result for transport
    pub async fn apply_request(&self, request: ApplyRequest) -> Result<ApplyResponse> {
        let version = request
            .version
            .clone()
            .unwrap_or_else(|| self.config.default_version.clone());
        let changes = changes_from_records(request.changes)?;

        self.apply_migration(&changes).await?;
        Ok(ApplyResponse::success(version))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The injected connection
    pub fn connection(&self) -> &DatabaseConnection {
        self.executor.connection()
    }

    /// Close the injected connection. Later calls fail with a pool error.
    pub async fn close(&self) {
        self.connection().close().await;
    }
}
