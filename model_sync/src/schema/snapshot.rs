//! Introspection snapshots
//!
//! A snapshot is the raw structure read from a live database: native type
//! spellings, defaults exactly as the catalog reports them. Converting it into
//! a [`Schema`] normalizes those into canonical form without validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::mapper::native_column_type;
use crate::schema::types::{Column, ForeignKeyConstraint, Schema, Table};

/// Structure of a live database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionSnapshot {
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnSnapshot>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique_constraints: Vec<Vec<String>>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    pub native_type: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Postgres appends a cast to literal defaults: `'draft'::character varying`
static TRAILING_CAST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?s)(.*?)::[a-z_ ]+(\(\d+(,\s*\d+)?\))?(\[\])?$").expect("cast pattern is valid")
});

/// A catalog default reduced to its literal value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedDefault {
    None,
    Value(String),
    /// Sequence-backed default, i.e. an auto-increment column
    Sequence,
}

/// Strip catalog decoration from a default expression.
pub fn normalize_default(raw: Option<&str>) -> NormalizedDefault {
    let Some(raw) = raw.map(str::trim) else {
        return NormalizedDefault::None;
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return NormalizedDefault::None;
    }
    if raw.to_lowercase().starts_with("nextval(") {
        return NormalizedDefault::Sequence;
    }

    let mut value = raw;
    if let Some(captures) = TRAILING_CAST.captures(value) {
        if let Some(inner) = captures.get(1) {
            value = inner.as_str();
        }
    }
    if value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        value = &value[1..value.len() - 1];
    }
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        return NormalizedDefault::Value(value[1..value.len() - 1].replace("''", "'"));
    }
    if value.eq_ignore_ascii_case("null") {
        return NormalizedDefault::None;
    }
    NormalizedDefault::Value(value.to_string())
}

impl Schema {
    /// Reshape a live snapshot into the canonical representation.
    pub fn from_snapshot(snapshot: IntrospectionSnapshot) -> Schema {
        Schema::from_tables(snapshot.tables.into_iter().map(TableSnapshot::into_table))
    }
}

impl TableSnapshot {
    fn into_table(self) -> Table {
        let columns = self
            .columns
            .into_iter()
            .map(ColumnSnapshot::into_column)
            .collect();

        let table = Table::new(self.name, columns).with_primary_key(self.primary_key);
        let table = self
            .unique_constraints
            .into_iter()
            .fold(table, Table::with_unique);
        self.foreign_keys.into_iter().fold(table, |table, fk| {
            table.with_foreign_key(ForeignKeyConstraint {
                column: fk.column,
                referenced_table: fk.referenced_table,
                referenced_column: fk.referenced_column,
            })
        })
    }
}

impl ColumnSnapshot {
    fn into_column(self) -> Column {
        let (column_type, length) = native_column_type(&self.native_type);
        let (default, sequence) = match normalize_default(self.default.as_deref()) {
            NormalizedDefault::None => (None, false),
            NormalizedDefault::Value(value) => (Some(value), false),
            NormalizedDefault::Sequence => (None, true),
        };

        Column::new(self.name, column_type)
            .nullable(self.nullable)
            .with_length(length)
            .with_default(default)
            .auto_increment(self.auto_increment || sequence)
    }
}
