//! Database schema analyzer
//!
//! This module reads the structure of a live database into an
//! [`IntrospectionSnapshot`].

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::snapshot::{
    ColumnSnapshot, ForeignKeySnapshot, IntrospectionSnapshot, TableSnapshot,
};
use crate::schema::types::Schema;

/// Schema analyzer trait
#[async_trait]
trait Analyzer {
    /// List the base tables of the current schema
    async fn analyze_table_names(&self) -> Result<Vec<String>>;

    /// Read one table
    async fn analyze_table(&self, table_name: &str) -> Result<TableSnapshot>;

    /// Read every table
    async fn analyze_schema(&self) -> Result<IntrospectionSnapshot> {
        let mut tables = Vec::new();
        for name in self.analyze_table_names().await? {
            tables.push(self.analyze_table(&name).await?);
        }
        Ok(IntrospectionSnapshot { tables })
    }
}

/// Schema analyzer for database schema introspection
#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    connection: DatabaseConnection,
}

impl SchemaAnalyzer {
    /// Create a new schema analyzer
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Take a snapshot of the current database schema
    pub async fn analyze(&self) -> Result<IntrospectionSnapshot> {
        let result = match &self.connection {
            DatabaseConnection::Postgres(pool) => PostgresAnalyzer { pool }.analyze_schema().await,
            DatabaseConnection::MySql(pool) => MySqlAnalyzer { pool }.analyze_schema().await,
            DatabaseConnection::Sqlite(pool) => SqliteAnalyzer { pool }.analyze_schema().await,
        };

        let snapshot = result.map_err(|e| match e {
            Error::SqlxError(e) => Error::IntrospectionError(e.to_string()),
            other => other,
        })?;

        tracing::debug!(tables = snapshot.tables.len(), "Introspected database schema");
        Ok(snapshot)
    }

    /// Introspect and reshape into a schema
    pub async fn current_schema(&self) -> Result<Schema> {
        Ok(Schema::from_snapshot(self.analyze().await?))
    }
}

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct KeyRow {
    constraint_name: String,
    constraint_type: String,
    column_name: String,
}

#[derive(FromRow)]
struct ForeignKeyRow {
    column_name: String,
    ref_table: String,
    ref_column: String,
}

/// Split PRIMARY KEY / UNIQUE rows into the primary key and unique groups
fn group_keys(rows: Vec<KeyRow>) -> (Vec<String>, Vec<Vec<String>>) {
    let mut primary_key = Vec::new();
    let mut uniques: IndexMap<String, Vec<String>> = IndexMap::new();

    for row in rows {
        if row.constraint_type == "PRIMARY KEY" {
            primary_key.push(row.column_name);
        } else {
            uniques.entry(row.constraint_name).or_default().push(row.column_name);
        }
    }

    (primary_key, uniques.into_values().collect())
}

fn foreign_key_snapshots(rows: Vec<ForeignKeyRow>) -> Vec<ForeignKeySnapshot> {
    rows.into_iter()
        .map(|row| ForeignKeySnapshot {
            column: row.column_name,
            referenced_table: row.ref_table,
            referenced_column: row.ref_column,
        })
        .collect()
}

#[derive(FromRow)]
struct PgColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    column_default: Option<String>,
    character_maximum_length: Option<i32>,
    is_identity: Option<bool>,
}

/// PostgreSQL schema analyzer
struct PostgresAnalyzer<'a> {
    pool: &'a Pool<Postgres>,
}

#[async_trait]
impl<'a> Analyzer for PostgresAnalyzer<'a> {
    async fn analyze_table_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn analyze_table(&self, table_name: &str) -> Result<TableSnapshot> {
        let sql = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                character_maximum_length::int4 AS character_maximum_length,
                (is_identity = 'YES') AS is_identity
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let column_rows = sqlx::query_as::<_, PgColumnRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        let columns = column_rows
            .into_iter()
            .map(|col| {
                let native_type = match col.character_maximum_length {
                    Some(length) => format!("{}({})", col.data_type, length),
                    None => col.data_type,
                };
                ColumnSnapshot {
                    name: col.column_name,
                    native_type,
                    nullable: col.is_nullable == "YES",
                    default: col.column_default,
                    auto_increment: col.is_identity.unwrap_or(false),
                }
            })
            .collect();

        let sql = r#"
            SELECT
                tc.constraint_name::text AS constraint_name,
                tc.constraint_type::text AS constraint_type,
                kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = current_schema()
              AND tc.table_name = $1
              AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;

        let key_rows = sqlx::query_as::<_, KeyRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;
        let (primary_key, unique_constraints) = group_keys(key_rows);

        let sql = r#"
            SELECT
                kcu.column_name::text AS column_name,
                ccu.table_name::text AS ref_table,
                ccu.column_name::text AS ref_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON ccu.constraint_name = tc.constraint_name
             AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = current_schema()
              AND tc.table_name = $1
        "#;

        let fk_rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(TableSnapshot {
            name: table_name.to_string(),
            columns,
            primary_key,
            unique_constraints,
            foreign_keys: foreign_key_snapshots(fk_rows),
        })
    }
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    extra: Option<String>,
}

/// MySQL schema analyzer
struct MySqlAnalyzer<'a> {
    pool: &'a Pool<MySql>,
}

#[async_trait]
impl<'a> Analyzer for MySqlAnalyzer<'a> {
    async fn analyze_table_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn analyze_table(&self, table_name: &str) -> Result<TableSnapshot> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(column_type AS CHAR) AS column_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_default AS CHAR) AS column_default,
                CAST(extra AS CHAR) AS extra
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let column_rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        let columns = column_rows
            .into_iter()
            .map(|col| ColumnSnapshot {
                name: col.column_name,
                native_type: col.column_type,
                nullable: col.is_nullable == "YES",
                default: col.column_default,
                auto_increment: col
                    .extra
                    .map_or(false, |extra| extra.to_lowercase().contains("auto_increment")),
            })
            .collect();

        let sql = r#"
            SELECT
                CAST(t.constraint_name AS CHAR) AS constraint_name,
                CAST(t.constraint_type AS CHAR) AS constraint_type,
                CAST(k.column_name AS CHAR) AS column_name
            FROM information_schema.table_constraints t
            JOIN information_schema.key_column_usage k
              ON t.constraint_name = k.constraint_name
             AND t.table_schema = k.table_schema
             AND t.table_name = k.table_name
            WHERE t.table_schema = DATABASE()
              AND t.table_name = ?
              AND t.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY t.constraint_name, k.ordinal_position
        "#;

        let key_rows = sqlx::query_as::<_, KeyRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;
        let (primary_key, unique_constraints) = group_keys(key_rows);

        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(referenced_table_name AS CHAR) AS ref_table,
                CAST(referenced_column_name AS CHAR) AS ref_column
            FROM information_schema.key_column_usage
            WHERE table_schema = DATABASE()
              AND table_name = ?
              AND referenced_table_name IS NOT NULL
        "#;

        let fk_rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(table_name)
            .fetch_all(self.pool)
            .await?;

        Ok(TableSnapshot {
            name: table_name.to_string(),
            columns,
            primary_key,
            unique_constraints,
            foreign_keys: foreign_key_snapshots(fk_rows),
        })
    }
}

/// SQLite schema analyzer
struct SqliteAnalyzer<'a> {
    pool: &'a Pool<Sqlite>,
}

/// String literals and quoted identifiers in a CREATE statement
static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|`[^`]*`|\[[^\]]*\]"#).expect("quoted pattern is valid")
});

/// `PRIMARY KEY [ASC|DESC] [ON CONFLICT ...] AUTOINCREMENT`
static INLINE_AUTOINCREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bPRIMARY\s+KEY(?:\s+(?:ASC|DESC))?(?:\s+ON\s+CONFLICT\s+\w+)?\s+AUTOINCREMENT\b")
        .expect("autoincrement pattern is valid")
});

/// Whether a table's CREATE statement gives its key column AUTOINCREMENT.
fn declares_autoincrement(create_sql: &str) -> bool {
    INLINE_AUTOINCREMENT.is_match(&QUOTED.replace_all(create_sql, "''"))
}

fn pragma(name: &str, argument: &str) -> String {
    format!("PRAGMA {}(\"{}\")", name, argument.replace('"', "\"\""))
}

#[async_trait]
impl<'a> Analyzer for SqliteAnalyzer<'a> {
    async fn analyze_table_names(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT name AS table_name
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn analyze_table(&self, table_name: &str) -> Result<TableSnapshot> {
        let create_sql: Option<String> =
            sqlx::query_scalar::<_, Option<String>>("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table_name)
                .fetch_optional(self.pool)
                .await?
                .flatten();
        let has_autoincrement = create_sql.as_deref().map_or(false, declares_autoincrement);

        let rows = sqlx::query(&pragma("table_info", table_name))
            .fetch_all(self.pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        let mut pk_positions = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let native_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let default: Option<String> = row.try_get("dflt_value")?;
            let pk: i64 = row.try_get("pk")?;

            if pk > 0 {
                pk_positions.push((pk, name.clone()));
            }
            columns.push(ColumnSnapshot {
                name,
                native_type,
                nullable: notnull == 0,
                default,
                auto_increment: false,
            });
        }

        pk_positions.sort();
        let primary_key: Vec<String> = pk_positions.into_iter().map(|(_, name)| name).collect();

        // AUTOINCREMENT is only legal on a single INTEGER PRIMARY KEY
        if has_autoincrement {
            if let [only] = primary_key.as_slice() {
                if let Some(column) = columns.iter_mut().find(|c| &c.name == only) {
                    column.auto_increment = column.native_type.eq_ignore_ascii_case("integer");
                }
            }
        }

        let mut unique_constraints = Vec::new();
        let indexes = sqlx::query(&pragma("index_list", table_name))
            .fetch_all(self.pool)
            .await?;
        for index in indexes {
            let index_name: String = index.try_get("name")?;
            let unique: i64 = index.try_get("unique")?;
            let origin: String = index.try_get("origin")?;
            let partial: i64 = index.try_get("partial")?;
            // "u" is a UNIQUE constraint, "c" a CREATE UNIQUE INDEX; "pk" is the key
            if unique == 0 || partial != 0 || !matches!(origin.as_str(), "u" | "c") {
                continue;
            }

            let info = sqlx::query(&pragma("index_info", &index_name))
                .fetch_all(self.pool)
                .await?;
            let mut index_columns = Vec::with_capacity(info.len());
            for row in info {
                let seqno: i64 = row.try_get("seqno")?;
                let name: String = row.try_get("name")?;
                index_columns.push((seqno, name));
            }
            index_columns.sort();
            unique_constraints.push(index_columns.into_iter().map(|(_, name)| name).collect());
        }

        let fk_rows = sqlx::query(&pragma("foreign_key_list", table_name))
            .fetch_all(self.pool)
            .await?;
        let mut foreign_keys = Vec::with_capacity(fk_rows.len());
        for row in fk_rows {
            let referenced_column: Option<String> = row.try_get("to")?;
            foreign_keys.push(ForeignKeySnapshot {
                column: row.try_get("from")?,
                referenced_table: row.try_get("table")?,
                referenced_column: referenced_column.unwrap_or_default(),
            });
        }

        Ok(TableSnapshot {
            name: table_name.to_string(),
            columns,
            primary_key,
            unique_constraints,
            foreign_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT, email TEXT)", true)]
    #[case("CREATE TABLE t (id integer primary key desc autoincrement)", true)]
    #[case("CREATE TABLE t (id INTEGER PRIMARY KEY ON CONFLICT REPLACE AUTOINCREMENT)", true)]
    #[case("CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT DEFAULT 'PRIMARY KEY AUTOINCREMENT')", false)]
    #[case("CREATE TABLE t (id INTEGER PRIMARY KEY, \"AUTOINCREMENT\" TEXT)", false)]
    #[case("CREATE TABLE t (id INTEGER PRIMARY KEY, autoincrement_seed INTEGER)", false)]
    fn test_declares_autoincrement(#[case] sql: &str, #[case] expected: bool) {
        assert_eq!(declares_autoincrement(sql), expected);
    }
}
