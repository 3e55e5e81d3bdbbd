mod common;

use std::collections::BTreeSet;
use common::*;
use unitorm::{Connection, DbError, OrmError, Repository, SqlRepository};

async fn seeded_repository() -> (
    std::sync::Arc<unitorm::MemoryDatabase>,
    std::sync::Arc<unitorm::MemoryConnection>,
    SqlRepository,
) {
    let (db, connection, mut uow) = setup().await;
    let oslo = city("Oslo");
    let john = person("John", "Doe", 20);
    john.write().unwrap().city = unitorm::Reference::to(&oslo);
    uow.add(&oslo).unwrap();
    uow.add(&john).unwrap();
    uow.add(&person("Jane", "Roe", 33)).unwrap();
    uow.commit().await.unwrap();

    let repository = SqlRepository::new(connection.clone());
    (db, connection, repository)
}

fn columns(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_read_all_columns() {
    let (_db, connection, repository) = seeded_repository().await;
    let mut people = repository.read::<Person>(None).await.unwrap();
    people.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(
        last_sql(&connection),
        format!(r#"SELECT {} FROM "Person";"#, PERSON_COLUMNS)
    );
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].name, "Jane");
    assert!(people[0].city.is_none());
    assert_eq!(people[1].name, "John");
    assert!(people[1].city.id().is_some());
    assert!(!connection.is_open());
}

#[tokio::test]
async fn test_empty_column_set_falls_back_to_every_field() {
    let (_db, connection, repository) = seeded_repository().await;
    let cities = repository.read::<City>(Some(&BTreeSet::new())).await.unwrap();

    assert_eq!(last_sql(&connection), r#"SELECT "Id","Name" FROM "City";"#);
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].name, "Oslo");
}

#[tokio::test]
async fn test_requested_columns_only() {
    let (_db, connection, repository) = seeded_repository().await;
    let people = repository
        .read::<Person>(Some(&columns(&["CityId", "Surname"])))
        .await
        .unwrap();

    assert_eq!(last_sql(&connection), r#"SELECT "CityId","Surname" FROM "Person";"#);
    for person in &people {
        assert!(person.name.is_empty());
        assert!(!person.surname.is_empty());
    }
    assert_eq!(people.iter().filter(|p| !p.city.is_none()).count(), 1);
}

#[tokio::test]
async fn test_unknown_column_fails_before_io() {
    let db = seeded_database().await;
    let connection = connect(&db);
    let repository = SqlRepository::new(connection.clone());

    let err = repository
        .read::<Person>(Some(&columns(&["Height"])))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::SchemaMismatch(_)));

    let err = repository
        .read::<Person>(Some(&columns(&["City"])))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::SchemaMismatch(_)));

    let err = repository
        .read::<Person>(Some(&columns(&["TownId"])))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::SchemaMismatch(_)));

    assert_eq!(connection.stats().opened, 0);
}

#[tokio::test]
async fn test_type_without_fields_is_rejected() {
    let db = seeded_database().await;
    let connection = connect(&db);
    let repository = SqlRepository::new(connection.clone());

    let err = repository.read::<Marker>(None).await.unwrap_err();
    assert!(matches!(err, OrmError::EmptyOperation(_)));
    assert_eq!(connection.stats().opened, 0);
}

#[tokio::test]
async fn test_connection_closed_when_query_fails() {
    let db = std::sync::Arc::new(unitorm::MemoryDatabase::new());
    let connection = connect(&db);
    let repository = SqlRepository::new(connection.clone());

    let err = repository.read::<City>(None).await.unwrap_err();
    assert!(matches!(err, OrmError::Database(DbError::TableNotFound(_))));
    assert!(!connection.is_open());
    assert_eq!(connection.stats().opened, connection.stats().closed);
}

#[tokio::test]
async fn test_read_instances_are_untracked_copies() {
    let (_db, _connection, repository) = seeded_repository().await;
    let first = repository.read::<City>(None).await.unwrap();
    let second = repository.read::<City>(None).await.unwrap();

    assert_eq!(first[0].id(), second[0].id());
    let mut first = first;
    first[0].name = "Bergen".into();
    assert_eq!(second[0].name, "Oslo");
}
