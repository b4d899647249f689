//! Database module for model_sync
//!
//! This module handles the database connection and DDL execution.

pub mod connection;
pub mod executor;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use executor::MigrationExecutor;
