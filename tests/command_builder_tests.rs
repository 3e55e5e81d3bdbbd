mod common;

use std::collections::BTreeSet;
use common::*;
use unitorm::{CommandBuilder, EntityId, Model, OrmError, Reference, Value};

fn fields(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_insert_template() {
    let oslo = City::new();
    let mut builder = CommandBuilder::new();
    builder.append_insert(&oslo).unwrap();

    let command = builder.finish();
    assert_eq!(command.text(), r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);"#);
    assert_eq!(command.parameter("$1"), Some(&Value::Uuid(oslo.id().as_uuid())));
    assert_eq!(command.parameter("$2"), Some(&Value::Text(String::new())));
}

#[test]
fn test_insert_binds_reference_identifier() {
    let oslo = city("Oslo");
    let mut john = Person::new();
    john.city = Reference::to(&oslo);

    let mut builder = CommandBuilder::new();
    builder.append_insert(&john).unwrap();
    let command = builder.finish();

    assert_eq!(
        command.text(),
        format!(r#"INSERT INTO "Person" ({}) VALUES ($1,$2,$3,$4,$5,$6);"#, PERSON_COLUMNS)
    );
    let city_id = oslo.read().unwrap().id();
    assert_eq!(command.parameter("$6"), Some(&Value::Uuid(city_id.as_uuid())));
}

#[test]
fn test_zero_field_entity_is_rejected_before_binding() {
    let marker = Marker::with_id(EntityId::new());
    let mut builder = CommandBuilder::new();

    let err = builder.append_insert(&marker).unwrap_err();
    assert!(matches!(err, OrmError::EmptyOperation(_)));
    assert!(builder.command().is_empty());
    assert!(builder.command().parameters().is_empty());
}

#[test]
fn test_update_renders_dirty_fields_in_declaration_order() {
    let oslo = city("Oslo");
    let mut john = Person::new();
    john.name = "John".into();
    john.city = Reference::to(&oslo);

    let mut builder = CommandBuilder::new();
    builder
        .append_update_fields(&john, &fields(&["City", "Name"]))
        .unwrap();
    let command = builder.finish();

    assert_eq!(
        command.text(),
        r#"UPDATE "Person" SET "Name"=$1,"CityId"=$2 WHERE "Id"=$3;"#
    );
    assert_eq!(command.parameter("$1"), Some(&Value::Text("John".into())));
    assert_eq!(command.parameter("$3"), Some(&Value::Uuid(john.id().as_uuid())));
}

#[test]
fn test_update_of_cleared_reference_binds_null() {
    let john = Person::new();
    let mut builder = CommandBuilder::new();
    builder.append_update_fields(&john, &fields(&["City"])).unwrap();

    let command = builder.finish();
    assert_eq!(command.parameter("$1"), Some(&Value::Null));
}

#[test]
fn test_update_without_dirty_fields_appends_nothing() {
    let john = Person::new();
    let mut builder = CommandBuilder::new();
    builder.append_update_fields(&john, &BTreeSet::new()).unwrap();
    builder.append_update_fields(&john, &fields(&["Unknown"])).unwrap();
    assert!(builder.finish().is_empty());
}

#[test]
fn test_delete_template_and_validation() {
    let mut builder = CommandBuilder::new();

    let err = builder.append_delete(EntityId::nil(), "Person").unwrap_err();
    assert!(matches!(err, OrmError::Configuration(_)));
    let err = builder.append_delete(EntityId::new(), "").unwrap_err();
    assert!(matches!(err, OrmError::Configuration(_)));
    assert!(builder.command().is_empty());

    let id = EntityId::new();
    builder.append_delete(id, "Person").unwrap();
    let command = builder.finish();
    assert_eq!(command.text(), r#"DELETE FROM "Person" WHERE "Id" IN ($1);"#);
    assert_eq!(command.parameters().len(), 1);
    assert_eq!(command.parameter("$1"), Some(&Value::Uuid(id.as_uuid())));
}

#[test]
fn test_parameter_names_are_unique_across_statements() {
    let mut builder = CommandBuilder::new();
    builder.append_insert(&City::new()).unwrap();
    builder.append_insert(&Person::new()).unwrap();
    builder.append_delete(EntityId::new(), "City").unwrap();

    let command = builder.finish();
    let names: Vec<_> = command.parameters().iter().map(|p| p.name.clone()).collect();
    let expected: Vec<_> = (1..=9).map(|n| format!("${}", n)).collect();
    assert_eq!(names, expected);
    assert_eq!(statements(command.text()).len(), 3);
}
