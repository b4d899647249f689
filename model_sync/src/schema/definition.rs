//! Declarative model definitions
//!
//! The client describes the schema it wants as a list of models, each with a
//! list of fields. This module holds the serde shape of that description and
//! the validated conversion into a [`Schema`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::schema::mapper::lookup_type;
use crate::schema::types::{Column, ColumnType, ForeignKeyConstraint, Schema, Table};
use crate::utils::naming::{validate_default_value, validate_identifier};

/// The desired schema as sent by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub models: Vec<ModelDefinition>,
}

impl SchemaDefinition {
    /// Parse a JSON definition. Shape errors are validation errors.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input)
            .map_err(|e| Error::validation(format!("Invalid model definition: {}", e)))
    }

    /// Parse a YAML definition. Shape errors are validation errors.
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input)
            .map_err(|e| Error::validation(format!("Invalid model definition: {}", e)))
    }
}

/// One model, which becomes one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

/// One field of a model. Also used as the field shape of change records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyDefinition>,
}

/// Reference from a field to a field of another model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub model: String,
    pub field: String,
}

/// A default value as it may appear in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl DefaultValue {
    /// Textual form embedded in DDL
    pub fn to_sql_text(&self) -> String {
        match self {
            DefaultValue::Bool(true) => "1".to_string(),
            DefaultValue::Bool(false) => "0".to_string(),
            DefaultValue::Number(n) => n.to_string(),
            DefaultValue::Text(s) => s.clone(),
        }
    }
}

impl FieldDefinition {
    fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }

    /// Convert into a canonical column, validating name, type and default.
    pub fn to_column(&self, model: &str) -> Result<Column> {
        if self.name.is_empty() {
            return Err(Error::validation(format!(
                "A field of model '{}' is missing a name",
                model
            )));
        }
        if self.field_type.trim().is_empty() {
            return Err(Error::validation(format!(
                "Field '{}' of model '{}' is missing a type",
                self.name, model
            )));
        }
        validate_identifier("Field", &self.name)?;

        let column_type = match lookup_type(&self.field_type) {
            Some(column_type) => column_type,
            None => {
                tracing::warn!(
                    model,
                    field = %self.name,
                    field_type = %self.field_type,
                    "Unrecognized field type, defaulting to string"
                );
                ColumnType::String
            }
        };

        let default = self.default.as_ref().map(DefaultValue::to_sql_text);
        if let Some(value) = &default {
            validate_default_value(&self.name, value)?;
        }

        Ok(Column::new(self.name.clone(), column_type)
            .nullable(self.nullable.unwrap_or(false) && !self.is_primary())
            .with_length(self.length)
            .with_default(default)
            .auto_increment(self.auto_increment.unwrap_or(false)))
    }

    /// Describe a column for transport, with the constraint flags the
    /// owning table declares on it.
    pub fn describe(
        column: &Column,
        primary: bool,
        unique: bool,
        foreign_key: Option<&ForeignKeyConstraint>,
    ) -> Self {
        Self {
            name: column.name().to_string(),
            field_type: column.column_type().to_string(),
            length: column.length(),
            nullable: Some(column.is_nullable()),
            default: column
                .default_value()
                .map(|value| DefaultValue::Text(value.to_string())),
            auto_increment: Some(column.is_auto_increment()),
            primary: primary.then_some(true),
            unique: unique.then_some(true),
            foreign_key: foreign_key.map(|fk| ForeignKeyDefinition {
                model: fk.referenced_table.clone(),
                field: fk.referenced_column.clone(),
            }),
        }
    }

    /// Describe a column of `table` for transport
    pub fn describe_in_table(column: &Column, table: &Table) -> Self {
        Self::describe(
            column,
            table.is_primary(column.name()),
            table.is_unique(column.name()),
            table.foreign_key_for(column.name()),
        )
    }

    pub(crate) fn foreign_key_constraint(&self) -> Option<ForeignKeyConstraint> {
        self.foreign_key.as_ref().map(|fk| ForeignKeyConstraint {
            column: self.name.clone(),
            referenced_table: fk.model.clone(),
            referenced_column: fk.field.clone(),
        })
    }
}

impl ModelDefinition {
    /// Build one table. Foreign key targets are not checked here.
    pub fn to_table(&self) -> Result<Table> {
        validate_identifier("Model", &self.name)?;

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(self.fields.len());
        let mut primary_key = Vec::new();
        let mut uniques = Vec::new();
        let mut foreign_keys = Vec::new();

        for field in &self.fields {
            let column = field.to_column(&self.name)?;
            if !seen.insert(column.name().to_string()) {
                return Err(Error::validation(format!(
                    "Duplicate field '{}' in model '{}'",
                    column.name(),
                    self.name
                )));
            }

            if field.is_primary() {
                primary_key.push(column.name().to_string());
            }
            if field.unique.unwrap_or(false) {
                uniques.push(vec![column.name().to_string()]);
            }
            if let Some(fk) = field.foreign_key_constraint() {
                validate_identifier("Referenced model", &fk.referenced_table)?;
                validate_identifier("Referenced field", &fk.referenced_column)?;
                foreign_keys.push(fk);
            }
            columns.push(column);
        }

        // Every supported database ties auto-increment to a single-column key
        if let Some(column) = columns
            .iter()
            .find(|column| column.is_auto_increment() && primary_key != [column.name()])
        {
            return Err(Error::validation(format!(
                "Field '{}.{}' cannot be auto-increment: only a single-column primary key can be",
                self.name,
                column.name()
            )));
        }

        let table = Table::new(self.name.clone(), columns).with_primary_key(primary_key);
        let table = uniques.into_iter().fold(table, Table::with_unique);
        Ok(foreign_keys.into_iter().fold(table, Table::with_foreign_key))
    }
}

impl Schema {
    /// Build and validate the desired schema from a definition.
    pub fn from_definition(definition: &SchemaDefinition) -> Result<Schema> {
        let mut tables: IndexMap<String, Table> = IndexMap::new();

        for model in &definition.models {
            let table = model.to_table()?;
            if tables.contains_key(table.name()) {
                return Err(Error::validation(format!(
                    "Duplicate model '{}'",
                    table.name()
                )));
            }
            tables.insert(table.name().to_string(), table);
        }

        for table in tables.values() {
            for fk in table.foreign_keys() {
                let target = tables.get(&fk.referenced_table).ok_or_else(|| {
                    Error::validation(format!(
                        "Field '{}.{}' references unknown model '{}'",
                        table.name(),
                        fk.column,
                        fk.referenced_table
                    ))
                })?;
                if target.column(&fk.referenced_column).is_none() {
                    return Err(Error::validation(format!(
                        "Field '{}.{}' references unknown field '{}.{}'",
                        table.name(),
                        fk.column,
                        fk.referenced_table,
                        fk.referenced_column
                    )));
                }
            }
        }

        tracing::debug!(tables = tables.len(), "Built desired schema from definition");
        Ok(Schema::from_tables(tables.into_values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(json: &str) -> SchemaDefinition {
        SchemaDefinition::from_json(json).unwrap()
    }

    #[test]
    fn test_users_definition() {
        let def = definition(
            r#"{"models":[{"name":"users","fields":[
                {"name":"id","type":"integer","primary":true,"autoIncrement":true},
                {"name":"email","type":"string","length":120,"unique":true}
            ]}]}"#,
        );
        let schema = Schema::from_definition(&def).unwrap();
        let users = schema.table("users").unwrap();

        assert_eq!(
            users.columns(),
            &[
                Column::new("id", ColumnType::Integer).auto_increment(true),
                Column::new("email", ColumnType::String).with_length(Some(120)),
            ]
        );
        assert!(users.is_primary("id"));
        assert!(users.is_unique("email"));
    }

    #[test]
    fn test_primary_key_is_never_nullable() {
        let def = definition(
            r#"{"models":[{"name":"t","fields":[
                {"name":"id","type":"integer","primary":true,"nullable":true}
            ]}]}"#,
        );
        let schema = Schema::from_definition(&def).unwrap();
        assert!(!schema.table("t").unwrap().columns()[0].is_nullable());
    }

    #[test]
    fn test_composite_primary_key() {
        let def = definition(
            r#"{"models":[{"name":"memberships","fields":[
                {"name":"user_id","type":"integer","primary":true},
                {"name":"group_id","type":"integer","primary":true}
            ]}]}"#,
        );
        let schema = Schema::from_definition(&def).unwrap();
        let pk = schema.table("memberships").unwrap().primary_key().unwrap();
        assert_eq!(pk.columns, vec!["user_id".to_string(), "group_id".to_string()]);
    }

    #[test]
    fn test_auto_increment_outside_primary_key_is_rejected() {
        for fields in [
            r#"[{"name":"seq","type":"integer","autoIncrement":true},{"name":"label","type":"string"}]"#,
            r#"[{"name":"a","type":"integer","primary":true,"autoIncrement":true},
                {"name":"b","type":"integer","primary":true}]"#,
        ] {
            let def = definition(&format!(
                r#"{{"models":[{{"name":"counters","fields":{}}}]}}"#,
                fields
            ));
            let err = Schema::from_definition(&def).unwrap_err();
            assert!(err.to_string().contains("cannot be auto-increment"), "{}", err);
        }
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let def = definition(r#"{"models":[{"name":"users","fields":[{"name":"id"}]}]}"#);
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert!(err.to_string().contains("missing a type"));
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let def = definition(r#"{"models":[{"name":"users","fields":[{"type":"string"}]}]}"#);
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("missing a name"));
    }

    #[test]
    fn test_duplicate_model_is_rejected() {
        let def = definition(
            r#"{"models":[
                {"name":"users","fields":[{"name":"id","type":"integer"}]},
                {"name":"users","fields":[{"name":"id","type":"integer"}]}
            ]}"#,
        );
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("Duplicate model 'users'"));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let def = definition(
            r#"{"models":[{"name":"users","fields":[
                {"name":"email","type":"string"},
                {"name":"email","type":"text"}
            ]}]}"#,
        );
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("Duplicate field 'email'"));
    }

    #[test]
    fn test_unknown_foreign_key_target_is_rejected() {
        let def = definition(
            r#"{"models":[{"name":"posts","fields":[
                {"name":"user_id","type":"integer","foreignKey":{"model":"users","field":"id"}}
            ]}]}"#,
        );
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("unknown model 'users'"));
    }

    #[test]
    fn test_unknown_foreign_key_field_is_rejected() {
        let def = definition(
            r#"{"models":[
                {"name":"users","fields":[{"name":"id","type":"integer"}]},
                {"name":"posts","fields":[
                    {"name":"user_id","type":"integer","foreignKey":{"model":"users","field":"uuid"}}
                ]}
            ]}"#,
        );
        let err = Schema::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("unknown field 'users.uuid'"));
    }

    #[test]
    fn test_unknown_type_defaults_to_string() {
        let def = definition(
            r#"{"models":[{"name":"t","fields":[{"name":"payload","type":"jsonb"}]}]}"#,
        );
        let schema = Schema::from_definition(&def).unwrap();
        let column = &schema.table("t").unwrap().columns()[0];
        assert_eq!(column.column_type(), ColumnType::String);
        assert_eq!(column.length(), Some(255));
    }

    #[test]
    fn test_unsafe_identifier_is_rejected() {
        let def = definition(
            r#"{"models":[{"name":"users; DROP TABLE users","fields":[]}]}"#,
        );
        assert!(Schema::from_definition(&def).is_err());
    }

    #[test]
    fn test_default_values() {
        let def = definition(
            r#"{"models":[{"name":"posts","fields":[
                {"name":"status","type":"string","default":"draft"},
                {"name":"views","type":"integer","default":0},
                {"name":"published","type":"boolean","default":false}
            ]}]}"#,
        );
        let schema = Schema::from_definition(&def).unwrap();
        let defaults: Vec<_> = schema
            .table("posts")
            .unwrap()
            .columns()
            .iter()
            .map(|c| c.default_value())
            .collect();
        assert_eq!(defaults, vec![Some("draft"), Some("0"), Some("0")]);
    }

    #[test]
    fn test_missing_models_is_a_validation_error() {
        let err = SchemaDefinition::from_json(r#"{"version":"1.0.0"}"#).unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn test_yaml_definition() {
        let def = SchemaDefinition::from_yaml(
            "version: '1.1.0'\nmodels:\n  - name: tags\n    fields:\n      - name: label\n        type: string\n",
        )
        .unwrap();
        assert_eq!(def.version.as_deref(), Some("1.1.0"));
        assert_eq!(def.models[0].fields[0].name, "label");
    }
}
