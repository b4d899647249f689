//! Diff behaviour against hand-built schemas

use pretty_assertions::assert_eq;
use rstest::*;

use model_sync::schema::types::{Column, ColumnType, ForeignKeyConstraint, Table};
use model_sync::{Change, Schema, SchemaDefinition, SchemaDiff};

#[fixture]
fn users_definition() -> SchemaDefinition {
    SchemaDefinition::from_json(
        r#"{
            "version": "1.0.0",
            "models": [{
                "name": "users",
                "fields": [
                    {"name": "id", "type": "integer", "primary": true, "autoIncrement": true},
                    {"name": "email", "type": "string", "unique": true},
                    {"name": "created_at", "type": "datetime", "nullable": true}
                ]
            }]
        }"#,
    )
    .unwrap()
}

fn live_users(columns: Vec<Column>) -> Schema {
    Schema::from_tables([Table::new("users", columns).with_primary_key(vec!["id".into()])])
}

#[rstest]
fn test_identical_schemas_produce_no_changes(users_definition: SchemaDefinition) {
    let desired = Schema::from_definition(&users_definition).unwrap();
    let diff = SchemaDiff::generate(&desired, &desired);
    assert!(diff.is_empty());
}

#[rstest]
fn test_missing_table_is_added_whole(users_definition: SchemaDefinition) {
    let desired = Schema::from_definition(&users_definition).unwrap();
    let diff = SchemaDiff::generate(&Schema::empty(), &desired);

    assert_eq!(diff.len(), 1);
    match &diff.changes()[0] {
        Change::AddTable(table) => {
            assert_eq!(table.name(), "users");
            assert_eq!(table.columns().len(), 3);
            assert!(table.is_primary("id"));
            assert!(table.is_unique("email"));
        }
        other => panic!("expected add_table, got {:?}", other),
    }
}

#[rstest]
fn test_missing_column_is_added(users_definition: SchemaDefinition) {
    let desired = Schema::from_definition(&users_definition).unwrap();
    let current = live_users(vec![
        Column::new("id", ColumnType::Integer).auto_increment(true),
        Column::new("email", ColumnType::String),
    ]);

    let changes = SchemaDiff::generate(&current, &desired).into_changes();
    assert_eq!(
        changes,
        vec![Change::AddColumn {
            table: "users".into(),
            column: Column::new("created_at", ColumnType::Datetime).nullable(true),
            unique: false,
            foreign_key: None,
        }]
    );
}

#[rstest]
fn test_changed_length_is_modified(users_definition: SchemaDefinition) {
    let desired = Schema::from_definition(&users_definition).unwrap();
    let current = live_users(vec![
        Column::new("id", ColumnType::Integer).auto_increment(true),
        Column::new("email", ColumnType::String).with_length(Some(120)),
        Column::new("created_at", ColumnType::Datetime).nullable(true),
    ]);

    let changes = SchemaDiff::generate(&current, &desired).into_changes();
    assert_eq!(
        changes,
        vec![Change::ModifyColumn {
            table: "users".into(),
            old_name: "email".into(),
            column: Column::new("email", ColumnType::String).with_length(Some(255)),
        }]
    );
}

#[rstest]
fn test_extra_tables_and_columns_are_left_alone(users_definition: SchemaDefinition) {
    let desired = Schema::from_definition(&users_definition).unwrap();
    let current = Schema::from_tables([
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Integer).auto_increment(true),
                Column::new("email", ColumnType::String),
                Column::new("created_at", ColumnType::Datetime).nullable(true),
                Column::new("legacy_flag", ColumnType::Boolean),
            ],
        )
        .with_primary_key(vec!["id".into()]),
        Table::new("audit_log", vec![Column::new("entry", ColumnType::Text)]),
    ]);

    assert!(SchemaDiff::generate(&current, &desired).is_empty());
}

#[test]
fn test_tables_come_before_column_changes() {
    let definition = SchemaDefinition::from_json(
        r#"{"models": [
            {"name": "users", "fields": [
                {"name": "id", "type": "integer", "primary": true},
                {"name": "nickname", "type": "string", "nullable": true}
            ]},
            {"name": "posts", "fields": [
                {"name": "id", "type": "integer", "primary": true},
                {"name": "author_id", "type": "integer", "foreignKey": {"model": "users", "field": "id"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let desired = Schema::from_definition(&definition).unwrap();
    let current = Schema::from_tables([Table::new(
        "users",
        vec![Column::new("id", ColumnType::Integer)],
    )
    .with_primary_key(vec!["id".into()])]);

    let diff = SchemaDiff::generate(&current, &desired);
    let actions: Vec<(&str, &str)> = diff
        .changes()
        .iter()
        .map(|c| (c.action(), c.table_name()))
        .collect();
    assert_eq!(actions, vec![("add_table", "posts"), ("add_field", "users")]);

    let Change::AddTable(posts) = &diff.changes()[0] else {
        panic!("expected add_table first");
    };
    assert_eq!(
        posts.foreign_key_for("author_id"),
        Some(&ForeignKeyConstraint {
            column: "author_id".into(),
            referenced_table: "users".into(),
            referenced_column: "id".into(),
        })
    );
}

#[test]
fn test_added_column_carries_its_foreign_key() {
    let definition = SchemaDefinition::from_json(
        r#"{"models": [
            {"name": "users", "fields": [{"name": "id", "type": "integer", "primary": true}]},
            {"name": "posts", "fields": [
                {"name": "id", "type": "integer", "primary": true},
                {"name": "author_id", "type": "integer", "nullable": true,
                 "foreignKey": {"model": "users", "field": "id"}}
            ]}
        ]}"#,
    )
    .unwrap();
    let desired = Schema::from_definition(&definition).unwrap();
    let current = Schema::from_tables([
        Table::new("users", vec![Column::new("id", ColumnType::Integer)])
            .with_primary_key(vec!["id".into()]),
        Table::new("posts", vec![Column::new("id", ColumnType::Integer)])
            .with_primary_key(vec!["id".into()]),
    ]);

    let changes = SchemaDiff::generate(&current, &desired).into_changes();
    assert_eq!(changes.len(), 1);
    let Change::AddColumn { foreign_key, .. } = &changes[0] else {
        panic!("expected add_field");
    };
    assert_eq!(foreign_key.as_ref().map(|fk| fk.referenced_table.as_str()), Some("users"));
}

#[rstest]
#[case::nullability(Column::new("email", ColumnType::String).nullable(true))]
#[case::default(Column::new("email", ColumnType::String).with_default(Some("x".into())))]
#[case::type_change(Column::new("email", ColumnType::Text))]
fn test_column_attribute_changes_are_detected(#[case] live: Column) {
    let desired = Schema::from_tables([Table::new(
        "users",
        vec![Column::new("email", ColumnType::String)],
    )]);
    let current = Schema::from_tables([Table::new("users", vec![live])]);

    let changes = SchemaDiff::generate(&current, &desired).into_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action(), "modify_field");
}

#[test]
fn test_added_column_carries_its_unique_flag() {
    let definition = SchemaDefinition::from_json(
        r#"{"models": [{"name": "users", "fields": [
            {"name": "id", "type": "integer", "primary": true},
            {"name": "handle", "type": "string", "nullable": true, "unique": true}
        ]}]}"#,
    )
    .unwrap();
    let desired = Schema::from_definition(&definition).unwrap();
    let current = Schema::from_tables([Table::new(
        "users",
        vec![Column::new("id", ColumnType::Integer)],
    )
    .with_primary_key(vec!["id".into()])]);

    let changes = SchemaDiff::generate(&current, &desired).into_changes();
    assert!(matches!(&changes[..], [Change::AddColumn { unique: true, .. }]));
}
