//! Transport records
//!
//! JSON shapes exchanged with the boundary layer. Changes travel as tagged
//! records and are converted back into typed [`Change`] values on apply.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::definition::{FieldDefinition, ModelDefinition, SchemaDefinition};
use crate::schema::diff::Change;
use crate::utils::naming::validate_identifier;

/// Body of a diff request: the desired models plus their version
pub type DiffRequest = SchemaDefinition;

/// One change as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeRecord {
    AddTable {
        table: String,
        fields: Vec<FieldDefinition>,
    },
    AddField {
        table: String,
        field: FieldDefinition,
    },
    ModifyField {
        table: String,
        /// Name of the existing column
        field: String,
        change: FieldDefinition,
    },
}

impl From<&Change> for ChangeRecord {
    fn from(change: &Change) -> Self {
        match change {
            Change::AddTable(table) => ChangeRecord::AddTable {
                table: table.name().to_string(),
                fields: table
                    .columns()
                    .iter()
                    .map(|column| FieldDefinition::describe_in_table(column, table))
                    .collect(),
            },
            Change::AddColumn {
                table,
                column,
                unique,
                foreign_key,
            } => ChangeRecord::AddField {
                table: table.clone(),
                field: FieldDefinition::describe(column, false, *unique, foreign_key.as_ref()),
            },
            Change::ModifyColumn {
                table,
                old_name,
                column,
            } => ChangeRecord::ModifyField {
                table: table.clone(),
                field: old_name.clone(),
                change: FieldDefinition::describe(column, false, false, None),
            },
        }
    }
}

impl TryFrom<ChangeRecord> for Change {
    type Error = Error;

    fn try_from(record: ChangeRecord) -> Result<Self> {
        match record {
            ChangeRecord::AddTable { table, fields } => {
                let model = ModelDefinition { name: table, fields };
                Ok(Change::AddTable(model.to_table()?))
            }
            ChangeRecord::AddField { table, field } => {
                validate_identifier("Table", &table)?;
                let column = field.to_column(&table)?;
                if column.is_auto_increment() {
                    return Err(Error::validation(format!(
                        "Field '{}.{}' cannot be auto-increment: only a table's primary key can be",
                        table,
                        column.name()
                    )));
                }
                Ok(Change::AddColumn {
                    unique: field.unique.unwrap_or(false),
                    foreign_key: field.foreign_key_constraint(),
                    table,
                    column,
                })
            }
            ChangeRecord::ModifyField {
                table,
                field,
                mut change,
            } => {
                validate_identifier("Table", &table)?;
                validate_identifier("Field", &field)?;
                if change.name.is_empty() {
                    change.name = field.clone();
                } else if change.name != field {
                    return Err(Error::validation(format!(
                        "Renaming '{}.{}' to '{}' is not supported",
                        table, field, change.name
                    )));
                }
                let column = change.to_column(&table)?;
                Ok(Change::ModifyColumn {
                    table,
                    old_name: field,
                    column,
                })
            }
        }
    }
}

/// Convert a list of change records, failing on the first malformed one
pub fn changes_from_records(records: Vec<ChangeRecord>) -> Result<Vec<Change>> {
    records.into_iter().map(Change::try_from).collect()
}

/// Response to a diff request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub status: String,
    pub current_version: String,
    pub new_version: String,
    pub changes: Vec<ChangeRecord>,
}

/// Body of an apply request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub changes: Vec<ChangeRecord>,
}

impl ApplyRequest {
    /// Parse an apply request. Shape errors are validation errors.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|e| Error::validation(format!("Invalid changes format: {}", e)))
    }
}

/// Response to an apply request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub status: String,
    pub message: String,
    pub current_version: String,
}

impl ApplyResponse {
    pub fn success(current_version: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: "Migration applied successfully.".to_string(),
            current_version: current_version.into(),
        }
    }

    pub fn from_error(error: &Error, current_version: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: error.to_string(),
            current_version: current_version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Column, ColumnType, Table};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_add_table_record_shape() {
        let table = Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Integer).auto_increment(true),
                Column::new("email", ColumnType::String).with_length(Some(120)),
            ],
        )
        .with_primary_key(vec!["id".into()])
        .with_unique(vec!["email".into()]);

        let record = ChangeRecord::from(&Change::AddTable(table));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "action": "add_table",
                "table": "users",
                "fields": [
                    {"name": "id", "type": "integer", "nullable": false, "autoIncrement": true, "primary": true},
                    {"name": "email", "type": "string", "length": 120, "nullable": false, "autoIncrement": false, "unique": true}
                ]
            })
        );
    }

    #[test]
    fn test_modify_field_record_shape() {
        let change = Change::ModifyColumn {
            table: "users".into(),
            old_name: "email".into(),
            column: Column::new("email", ColumnType::String).with_length(Some(255)),
        };
        assert_eq!(
            serde_json::to_value(ChangeRecord::from(&change)).unwrap(),
            json!({
                "action": "modify_field",
                "table": "users",
                "field": "email",
                "change": {"name": "email", "type": "string", "length": 255, "nullable": false, "autoIncrement": false}
            })
        );
    }

    #[test]
    fn test_records_convert_back_to_changes() {
        let change = Change::AddColumn {
            table: "posts".into(),
            column: Column::new("user_id", ColumnType::Integer).nullable(true),
            unique: true,
            foreign_key: Some(crate::schema::types::ForeignKeyConstraint {
                column: "user_id".into(),
                referenced_table: "users".into(),
                referenced_column: "id".into(),
            }),
        };
        let record = ChangeRecord::from(&change);
        assert_eq!(Change::try_from(record).unwrap(), change);
    }

    #[test]
    fn test_add_field_record_keeps_unique_flag() {
        let request = ApplyRequest::from_json(
            r#"{"changes":[{"action":"add_field","table":"users",
                "field":{"name":"handle","type":"string","nullable":true,"unique":true}}]}"#,
        )
        .unwrap();
        let changes = changes_from_records(request.changes).unwrap();
        assert!(matches!(&changes[0], Change::AddColumn { unique: true, .. }));
    }

    #[test]
    fn test_added_field_cannot_be_auto_increment() {
        let request = ApplyRequest::from_json(
            r#"{"changes":[{"action":"add_field","table":"counters",
                "field":{"name":"seq","type":"integer","autoIncrement":true}}]}"#,
        )
        .unwrap();
        let err = changes_from_records(request.changes).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_rename_is_rejected() {
        let request = ApplyRequest::from_json(
            r#"{"changes":[{"action":"modify_field","table":"users","field":"email",
                "change":{"name":"mail","type":"string"}}]}"#,
        )
        .unwrap();
        let err = changes_from_records(request.changes).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn test_unknown_action_is_a_validation_error() {
        let err = ApplyRequest::from_json(
            r#"{"changes":[{"action":"drop_table","table":"users"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_missing_changes_is_a_validation_error() {
        let err = ApplyRequest::from_json(r#"{"version":"1.0.0"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid changes format"));
    }
}
