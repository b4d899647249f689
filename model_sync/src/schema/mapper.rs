//! Type mapping
//!
//! Translates between abstract field type names, canonical column types and
//! the literal type syntax of each SQL dialect. All column rendering used by
//! the DDL generator goes through [`render_column_definition`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::types::{Column, ColumnType, DEFAULT_STRING_LENGTH};
use crate::utils::naming::quote_literal;

/// SQL syntax variant targeted by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI-flavoured fallback for unknown drivers
    #[default]
    Generic,
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Resolve a driver name. Unknown drivers get the generic rendering.
    pub fn from_driver(driver: &str) -> Self {
        match driver.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" | "pdo_pgsql" => Dialect::Postgres,
            "mysql" | "mariadb" | "pdo_mysql" => Dialect::MySql,
            "sqlite" | "sqlite3" | "pdo_sqlite" => Dialect::Sqlite,
            _ => Dialect::Generic,
        }
    }

    /// Whether DDL can be rolled back inside a transaction
    pub fn supports_transactional_ddl(&self) -> bool {
        !matches!(self, Dialect::MySql)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::Generic => "generic",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        })
    }
}

/// Strict lookup of an abstract field type name
pub fn lookup_type(name: &str) -> Option<ColumnType> {
    match name.trim().to_lowercase().as_str() {
        "string" => Some(ColumnType::String),
        "integer" => Some(ColumnType::Integer),
        "text" => Some(ColumnType::Text),
        "datetime" => Some(ColumnType::Datetime),
        "boolean" => Some(ColumnType::Boolean),
        "float" => Some(ColumnType::Float),
        _ => None,
    }
}

/// Map an abstract field type name to a canonical type.
///
/// Unrecognized names fall back to `string` and emit a warning event.
pub fn canonical_type(name: &str) -> ColumnType {
    lookup_type(name).unwrap_or_else(|| {
        tracing::warn!(field_type = name, "Unrecognized field type, defaulting to string");
        ColumnType::String
    })
}

/// Render the storage type of a column, ignoring auto-increment.
pub fn render_base_type(column: &Column, dialect: Dialect) -> String {
    let length = column.length().unwrap_or(DEFAULT_STRING_LENGTH);

    match (column.column_type(), dialect) {
        (ColumnType::String, _) => format!("VARCHAR({})", length),
        (ColumnType::Integer, Dialect::MySql) => "INT".to_string(),
        (ColumnType::Integer, _) => "INTEGER".to_string(),
        (ColumnType::Text, _) => "TEXT".to_string(),
        (ColumnType::Datetime, Dialect::Postgres) => "TIMESTAMP".to_string(),
        (ColumnType::Datetime, _) => "DATETIME".to_string(),
        (ColumnType::Boolean, Dialect::MySql) => "TINYINT(1)".to_string(),
        (ColumnType::Boolean, _) => "BOOLEAN".to_string(),
        (ColumnType::Float, Dialect::Postgres) => "DOUBLE PRECISION".to_string(),
        (ColumnType::Float, Dialect::MySql) => "DOUBLE".to_string(),
        (ColumnType::Float, _) => "FLOAT".to_string(),
    }
}

/// Render the DDL type fragment of a column, e.g. `VARCHAR(255)`.
///
/// Postgres expresses auto-increment through the `SERIAL` pseudo-type.
pub fn render_ddl_type(column: &Column, dialect: Dialect) -> String {
    if column.is_auto_increment() && dialect == Dialect::Postgres {
        return "SERIAL".to_string();
    }
    render_base_type(column, dialect)
}

/// Keyword appended to auto-increment columns, if the dialect has one.
///
/// SQLite only allows `AUTOINCREMENT` directly after an inline
/// `PRIMARY KEY`, so the generator renders it there instead.
pub fn auto_increment_clause(dialect: Dialect) -> Option<&'static str> {
    match dialect {
        Dialect::Generic | Dialect::MySql => Some("AUTO_INCREMENT"),
        Dialect::Postgres | Dialect::Sqlite => None,
    }
}

/// Render everything after the column name: type, nullability, default and
/// auto-increment.
pub fn render_column_definition(column: &Column, dialect: Dialect) -> String {
    let mut definition = render_ddl_type(column, dialect);

    if !column.is_nullable() {
        definition.push_str(" NOT NULL");
    }

    if let Some(default) = column.default_value() {
        definition.push_str(" DEFAULT ");
        definition.push_str(&quote_literal(default, dialect));
    }

    if column.is_auto_increment() {
        if let Some(clause) = auto_increment_clause(dialect) {
            definition.push(' ');
            definition.push_str(clause);
        }
    }

    definition
}

/// Map a database's native type spelling back to a canonical type and length.
pub fn native_column_type(native: &str) -> (ColumnType, Option<u32>) {
    let normalized = native.trim().to_lowercase();
    let (base, args) = match normalized.find('(') {
        Some(open) => {
            let close = normalized[open..].find(')').map_or(normalized.len(), |c| open + c);
            let rest = normalized[close..].trim_start_matches(')').trim();
            let base = format!("{} {}", normalized[..open].trim(), rest);
            (base.trim().to_string(), Some(normalized[open + 1..close].to_string()))
        }
        None => (normalized.clone(), None),
    };
    let base = base.trim_end_matches(" unsigned").trim();
    let size = args
        .as_deref()
        .and_then(|a| a.split(',').next())
        .and_then(|a| a.trim().parse::<u32>().ok());

    let column_type = match base {
        "varchar" | "character varying" | "char" | "character" | "nvarchar" | "nchar"
        | "varchar2" | "bpchar" | "string" => ColumnType::String,
        "tinyint" | "bit" if size == Some(1) => ColumnType::Boolean,
        "boolean" | "bool" => ColumnType::Boolean,
        "int" | "integer" | "bigint" | "smallint" | "mediumint" | "tinyint" | "serial"
        | "bigserial" | "smallserial" | "int2" | "int4" | "int8" => ColumnType::Integer,
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => ColumnType::Text,
        "datetime" | "timestamp" | "timestamp without time zone" | "timestamp with time zone"
        | "timestamptz" => ColumnType::Datetime,
        "float" | "double" | "double precision" | "real" | "float4" | "float8" | "decimal"
        | "numeric" => ColumnType::Float,
        other => {
            tracing::debug!(native_type = other, "Unmapped native type, treating as string");
            ColumnType::String
        }
    };

    let length = match column_type {
        ColumnType::String => size,
        _ => None,
    };

    (column_type, length)
}
