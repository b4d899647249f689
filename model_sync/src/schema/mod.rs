//! Schema module for model_sync
//!
//! This module handles the schema model, type mapping, introspection,
//! comparison and DDL generation.

pub mod analyzer;
pub mod definition;
pub mod diff;
pub mod generator;
pub mod mapper;
pub mod snapshot;
pub mod types;

// Re-export key types
pub use analyzer::SchemaAnalyzer;
pub use definition::{FieldDefinition, ForeignKeyDefinition, ModelDefinition, SchemaDefinition};
pub use diff::{Change, SchemaDiff};
pub use generator::MigrationGenerator;
pub use mapper::{canonical_type, render_column_definition, render_ddl_type, Dialect};
pub use snapshot::IntrospectionSnapshot;
pub use types::{Column, ColumnType, ForeignKeyConstraint, PrimaryKey, Schema, Table, UniqueConstraint};
