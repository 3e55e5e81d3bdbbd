mod common;

use std::sync::Arc;
use common::*;
use unitorm::{Command, Connection, DbError, MemoryConnection, MemoryDatabase, OpenConnection, Value};
use uuid::Uuid;

fn insert_city(id: Uuid, name: &str) -> Command {
    Command::new(r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);"#)
        .with_parameter("$1", id)
        .with_parameter("$2", name)
}

#[tokio::test]
async fn test_commands_require_an_open_connection() {
    let db = seeded_database().await;
    let connection = MemoryConnection::new(db);

    let err = connection
        .execute_non_query(&insert_city(Uuid::new_v4(), "Oslo"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ConnectionClosed));

    let scope = OpenConnection::open(&connection).unwrap();
    assert_eq!(scope.execute_non_query(&insert_city(Uuid::new_v4(), "Oslo")).await.unwrap(), 1);
    drop(scope);

    assert!(!connection.is_open());
    assert_eq!(connection.executed_commands().unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_is_atomic() {
    let db = seeded_database().await;
    let connection = MemoryConnection::new(db.clone());
    connection.open().unwrap();

    let batch = Command::new(
        r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);INSERT INTO "City" ("Id","Name") VALUES ($3,$4);"#,
    )
    .with_parameter("$1", Uuid::new_v4())
    .with_parameter("$2", "Oslo")
    .with_parameter("$3", Uuid::new_v4())
    .with_parameter("$4", Value::Null);

    let err = connection.execute_non_query(&batch).await.unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
    assert_eq!(db.row_count("City").await.unwrap(), 0);
    connection.close().unwrap();
}

#[tokio::test]
async fn test_update_and_delete_filters() {
    let db = seeded_database().await;
    let connection = MemoryConnection::new(db.clone());
    connection.open().unwrap();

    let (oslo, bergen, tromso) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    for (id, name) in [(oslo, "Oslo"), (bergen, "Bergen"), (tromso, "Tromso")] {
        connection.execute_non_query(&insert_city(id, name)).await.unwrap();
    }

    let rename = Command::new(r#"UPDATE "City" SET "Name"=$1 WHERE "Id"=$2;"#)
        .with_parameter("$1", "Christiania")
        .with_parameter("$2", oslo);
    assert_eq!(connection.execute_non_query(&rename).await.unwrap(), 1);

    let purge = Command::new(r#"DELETE FROM "City" WHERE "Id" IN ($1, $2);"#)
        .with_parameter("$1", bergen)
        .with_parameter("$2", tromso);
    assert_eq!(connection.execute_non_query(&purge).await.unwrap(), 2);

    let result = connection
        .execute_reader(&Command::new(r#"SELECT * FROM "City";"#))
        .await
        .unwrap();
    assert_eq!(result.columns(), ["Id".to_string(), "Name".to_string()]);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.get(0, "Id"), Some(&Value::Uuid(oslo)));
    assert_eq!(result.get(0, "Name"), Some(&Value::Text("Christiania".into())));
    connection.close().unwrap();
}

#[tokio::test]
async fn test_where_on_select_and_text_uuid_comparison() {
    let db = seeded_database().await;
    let connection = MemoryConnection::new(db);
    connection.open().unwrap();

    let id = Uuid::new_v4();
    connection.execute_non_query(&insert_city(id, "Oslo")).await.unwrap();
    connection
        .execute_non_query(&insert_city(Uuid::new_v4(), "Bergen"))
        .await
        .unwrap();

    let lookup = Command::new(r#"SELECT "Name" FROM "City" WHERE "Id" = $1;"#)
        .with_parameter("$1", id.to_string());
    let result = connection.execute_reader(&lookup).await.unwrap();
    assert_eq!(result.rows(), [vec![Value::Text("Oslo".into())]]);
    connection.close().unwrap();
}

#[tokio::test]
async fn test_type_checks() {
    let db = seeded_database().await;
    let connection = MemoryConnection::new(db);
    connection.open().unwrap();

    let bad = Command::new(r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);"#)
        .with_parameter("$1", 42i64)
        .with_parameter("$2", "Oslo");
    assert!(matches!(
        connection.execute_non_query(&bad).await,
        Err(DbError::TypeMismatch(_))
    ));

    let unknown = Command::new(r#"INSERT INTO "City" ("Id","Population") VALUES ($1,$2);"#)
        .with_parameter("$1", Uuid::new_v4())
        .with_parameter("$2", 700_000i64);
    assert!(matches!(
        connection.execute_non_query(&unknown).await,
        Err(DbError::ColumnNotFound(column, table)) if column == "Population" && table == "City"
    ));
    connection.close().unwrap();
}

#[test]
fn test_connections_share_one_database() {
    let db = Arc::new(MemoryDatabase::named("shared"));
    tokio_test::block_on(db.execute_sql(r#"CREATE TABLE "City" ("Id" UUID, "Name" TEXT)"#)).unwrap();

    let writer = MemoryConnection::new(db.clone());
    let reader = MemoryConnection::new(db.clone());
    writer.open().unwrap();
    reader.open().unwrap();

    tokio_test::block_on(writer.execute_non_query(&insert_city(Uuid::new_v4(), "Oslo"))).unwrap();
    let result = tokio_test::block_on(reader.execute_reader(&Command::new(r#"SELECT "Name" FROM "City";"#))).unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(tokio_test::block_on(db.table_names()), vec!["City".to_string()]);
    assert_eq!(reader.stats().executed, 1);
}
