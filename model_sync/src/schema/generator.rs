//! Migration generator
//!
//! This module turns schema changes into DDL statements for one dialect.
//! Column rendering is delegated to the type mapper.

use crate::schema::diff::Change;
use crate::schema::mapper::{render_base_type, render_column_definition, Dialect};
use crate::schema::types::{Column, ForeignKeyConstraint, Table};
use crate::utils::naming::quote_literal;

/// Migration SQL generator
#[derive(Debug, Clone, Copy)]
pub struct MigrationGenerator {
    dialect: Dialect,
}

impl MigrationGenerator {
    /// Create a new migration generator
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Generate the statements for every change, in order
    pub fn generate_all(&self, changes: &[Change]) -> Vec<String> {
        changes.iter().flat_map(|change| self.generate(change)).collect()
    }

    /// Generate the statements for one change
    pub fn generate(&self, change: &Change) -> Vec<String> {
        match change {
            Change::AddTable(table) => vec![self.generate_create_table_sql(table)],
            Change::AddColumn {
                table,
                column,
                unique,
                foreign_key,
            } => {
                let mut statements = self.generate_add_column_sql(table, column, foreign_key.as_ref());
                if *unique {
                    statements.push(self.generate_add_unique_sql(table, column.name()));
                }
                statements
            }
            Change::ModifyColumn {
                table,
                old_name,
                column,
            } => self.generate_modify_column_sql(table, old_name, column),
        }
    }

    /// Generate SQL to create a table
    fn generate_create_table_sql(&self, table: &Table) -> String {
        let inline_pk = self.sqlite_inline_primary_key(table);

        let mut definitions: Vec<String> = table
            .columns()
            .iter()
            .map(|column| {
                let mut def = format!(
                    "{} {}",
                    column.name(),
                    render_column_definition(column, self.dialect)
                );
                if inline_pk == Some(column.name()) {
                    def.push_str(" PRIMARY KEY AUTOINCREMENT");
                }
                def
            })
            .collect();

        if let Some(pk) = table.primary_key() {
            if inline_pk.is_none() {
                definitions.push(format!("PRIMARY KEY ({})", pk.columns.join(", ")));
            }
        }

        for unique in table.unique_constraints() {
            definitions.push(format!("UNIQUE ({})", unique.columns.join(", ")));
        }

        for fk in table.foreign_keys() {
            definitions.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column, fk.referenced_table, fk.referenced_column
            ));
        }

        format!("CREATE TABLE {} ({})", table.name(), definitions.join(", "))
    }

    /// SQLite only accepts AUTOINCREMENT on an inline single-column key
    fn sqlite_inline_primary_key<'t>(&self, table: &'t Table) -> Option<&'t str> {
        if self.dialect != Dialect::Sqlite {
            return None;
        }
        let pk = table.primary_key()?;
        match pk.columns.as_slice() {
            [only] => table
                .column(only)
                .filter(|column| column.is_auto_increment())
                .map(Column::name),
            _ => None,
        }
    }

    /// Generate SQL to add a column to an existing table
    fn generate_add_column_sql(
        &self,
        table_name: &str,
        column: &Column,
        foreign_key: Option<&ForeignKeyConstraint>,
    ) -> Vec<String> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table_name,
            column.name(),
            render_column_definition(column, self.dialect)
        );

        let Some(fk) = foreign_key else {
            return vec![sql];
        };

        match self.dialect {
            // MySQL parses but ignores inline REFERENCES
            Dialect::MySql => vec![
                sql,
                format!(
                    "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({})",
                    table_name, fk.column, fk.referenced_table, fk.referenced_column
                ),
            ],
            _ => {
                sql.push_str(&format!(
                    " REFERENCES {} ({})",
                    fk.referenced_table, fk.referenced_column
                ));
                vec![sql]
            }
        }
    }

    /// SQLite cannot add constraints to an existing table, only indexes
    fn generate_add_unique_sql(&self, table_name: &str, column_name: &str) -> String {
        match self.dialect {
            Dialect::Sqlite => format!(
                "CREATE UNIQUE INDEX {}_{}_unique ON {} ({})",
                table_name, column_name, table_name, column_name
            ),
            _ => format!("ALTER TABLE {} ADD UNIQUE ({})", table_name, column_name),
        }
    }

    /// Generate SQL to redefine an existing column
    fn generate_modify_column_sql(&self, table_name: &str, column_name: &str, column: &Column) -> Vec<String> {
        match self.dialect {
            Dialect::Postgres => self.generate_postgres_alter_column_sql(table_name, column_name, column),
            _ => vec![format!(
                "ALTER TABLE {} MODIFY COLUMN {} {}",
                table_name,
                column_name,
                render_column_definition(column, self.dialect)
            )],
        }
    }

    /// Postgres has no MODIFY COLUMN; each attribute is altered separately
    fn generate_postgres_alter_column_sql(
        &self,
        table_name: &str,
        column_name: &str,
        column: &Column,
    ) -> Vec<String> {
        let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", table_name, column_name);
        let base_type = render_base_type(column, self.dialect);

        let mut statements = vec![format!(
            "{} TYPE {} USING {}::{}",
            prefix, base_type, column_name, base_type
        )];

        statements.push(if column.is_nullable() {
            format!("{} DROP NOT NULL", prefix)
        } else {
            format!("{} SET NOT NULL", prefix)
        });

        if column.is_auto_increment() {
            statements.push(Self::postgres_attach_sequence_sql(table_name, column_name));
            return statements;
        }

        statements.push(match column.default_value() {
            Some(default) => format!("{} SET DEFAULT {}", prefix, quote_literal(default, self.dialect)),
            None => format!("{} DROP DEFAULT", prefix),
        });

        statements
    }

    /// Give a column a serial-style sequence unless it already has one.
    ///
    /// `pg_get_serial_sequence` also finds identity sequences, so serial and
    /// identity columns are left untouched. The new sequence starts after the
    /// largest existing value.
    fn postgres_attach_sequence_sql(table_name: &str, column_name: &str) -> String {
        let sequence = format!("{}_{}_seq", table_name, column_name);
        format!(
            "DO $$ BEGIN \
             IF pg_get_serial_sequence('{table}', '{column}') IS NULL THEN \
             CREATE SEQUENCE {sequence} OWNED BY {table}.{column}; \
             PERFORM setval('{sequence}', COALESCE((SELECT MAX({column}) FROM {table}), 0) + 1, false); \
             ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT nextval('{sequence}'); \
             END IF; \
             END $$",
            table = table_name,
            column = column_name,
            sequence = sequence,
        )
    }
}
