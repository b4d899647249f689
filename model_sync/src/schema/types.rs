//! Type definitions for database schema objects
//!
//! Schemas, tables and columns are value types: they are assembled once
//! through consuming constructors and then only read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length given to string columns that do not declare one
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Semantic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Text,
    Datetime,
    Boolean,
    Float,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
            ColumnType::Datetime => "datetime",
            ColumnType::Boolean => "boolean",
            ColumnType::Float => "float",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete database schema, keyed by table name.
///
/// Iteration follows insertion order, which for a schema built from a
/// definition is the declaration order of its models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create an empty schema
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a schema from tables. A later table replaces an earlier one
    /// with the same name; validated constructors reject duplicates first.
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|table| (table.name.clone(), table))
                .collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<PrimaryKey>,
    unique_constraints: Vec<UniqueConstraint>,
    foreign_keys: Vec<ForeignKeyConstraint>,
}

impl Table {
    /// Create a table with its columns in declaration order
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Set the primary key. An empty column list clears it.
    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = if columns.is_empty() {
            None
        } else {
            Some(PrimaryKey { columns })
        };
        self
    }

    pub fn with_unique(mut self, columns: Vec<String>) -> Self {
        self.unique_constraints.push(UniqueConstraint { columns });
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyConstraint) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyConstraint] {
        &self.foreign_keys
    }

    pub fn is_primary(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .map_or(false, |pk| pk.columns.iter().any(|c| c == column))
    }

    /// Whether a single-column unique constraint exists on `column`
    pub fn is_unique(&self, column: &str) -> bool {
        self.unique_constraints
            .iter()
            .any(|uc| uc.columns.len() == 1 && uc.columns[0] == column)
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKeyConstraint> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    length: Option<u32>,
    default: Option<String>,
    auto_increment: bool,
}

impl Column {
    /// Create a non-nullable column. String columns start with the default length.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            length: (column_type == ColumnType::String).then_some(DEFAULT_STRING_LENGTH),
            default: None,
            auto_increment: false,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set the length. Ignored for non-string columns.
    pub fn with_length(mut self, length: Option<u32>) -> Self {
        if self.column_type == ColumnType::String {
            self.length = Some(length.unwrap_or(DEFAULT_STRING_LENGTH));
        }
        self
    }

    /// Set a default value for the column
    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default.map(|value| match self.column_type {
            ColumnType::Boolean => normalize_boolean(&value),
            _ => value,
        });
        self
    }

    /// Set the auto-increment flag. Only integer columns keep it.
    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment && self.column_type == ColumnType::Integer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

fn normalize_boolean(value: &str) -> String {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "1" => "1".to_string(),
        "false" | "f" | "no" | "0" => "0".to_string(),
        _ => value.to_string(),
    }
}

/// Represents a primary key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
}

/// Represents a unique constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub columns: Vec<String>,
}

/// Represents a foreign key constraint. No referential actions are modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}
