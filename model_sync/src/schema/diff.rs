//! Schema difference calculator
//!
//! Compares the current schema of a database with the desired one and lists
//! the additive changes that bring the former in line with the latter.
//! Tables and columns missing from the desired schema are left alone.

use std::collections::HashMap;

use crate::schema::types::{Column, ForeignKeyConstraint, Schema, Table};

/// One structural difference between two schemas
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table with all of its columns and constraints
    AddTable(Table),
    /// Add a column to an existing table
    AddColumn {
        table: String,
        column: Column,
        /// Whether the column carries its own single-column UNIQUE constraint
        unique: bool,
        foreign_key: Option<ForeignKeyConstraint>,
    },
    /// Redefine an existing column. The column keeps its name.
    ModifyColumn {
        table: String,
        old_name: String,
        column: Column,
    },
}

impl Change {
    /// Name of the table the change applies to
    pub fn table_name(&self) -> &str {
        match self {
            Change::AddTable(table) => table.name(),
            Change::AddColumn { table, .. } | Change::ModifyColumn { table, .. } => table,
        }
    }

    /// Action name used in change records
    pub fn action(&self) -> &'static str {
        match self {
            Change::AddTable(_) => "add_table",
            Change::AddColumn { .. } => "add_field",
            Change::ModifyColumn { .. } => "modify_field",
        }
    }
}

/// Ordered list of changes needed to synchronize two schemas.
///
/// Every `AddTable` comes before any column change, so a column added in the
/// same batch can reference a table created earlier in it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    changes: Vec<Change>,
}

impl SchemaDiff {
    /// Generate a schema diff between the current and the desired schema
    pub fn generate(current_schema: &Schema, target_schema: &Schema) -> Self {
        // Tables to create (in target but not in current)
        let mut changes: Vec<Change> = target_schema
            .tables()
            .filter(|table| !current_schema.contains_table(table.name()))
            .cloned()
            .map(Change::AddTable)
            .collect();

        // Tables present in both; created tables never reach this loop
        for target_table in target_schema.tables() {
            let Some(current_table) = current_schema.table(target_table.name()) else {
                continue;
            };

            let current_columns: HashMap<&str, &Column> = current_table
                .columns()
                .iter()
                .map(|col| (col.name(), col))
                .collect();

            // Columns to add (in target but not in current)
            changes.extend(
                target_table
                    .columns()
                    .iter()
                    .filter(|col| !current_columns.contains_key(col.name()))
                    .map(|col| Change::AddColumn {
                        table: target_table.name().to_string(),
                        column: col.clone(),
                        unique: target_table.is_unique(col.name()),
                        foreign_key: target_table.foreign_key_for(col.name()).cloned(),
                    }),
            );

            // Columns to alter (different definition in target)
            changes.extend(target_table.columns().iter().filter_map(|target_col| {
                let current_col = current_columns.get(target_col.name())?;
                Self::column_needs_alteration(current_col, target_col).then(|| {
                    Change::ModifyColumn {
                        table: target_table.name().to_string(),
                        old_name: current_col.name().to_string(),
                        column: target_col.clone(),
                    }
                })
            }));
        }

        for change in &changes {
            tracing::debug!(action = change.action(), table = change.table_name(), "Schema change detected");
        }

        Self { changes }
    }

    /// Check if a column needs to be altered
    fn column_needs_alteration(current: &Column, target: &Column) -> bool {
        current.column_type() != target.column_type()
            || current.length() != target.length()
            || current.is_nullable() != target.is_nullable()
            || current.default_value() != target.default_value()
            || current.is_auto_increment() != target.is_auto_increment()
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

impl IntoIterator for SchemaDiff {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}
