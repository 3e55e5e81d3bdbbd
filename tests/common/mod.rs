#![allow(dead_code)]

use std::sync::Arc;
use unitorm::entity::{Field, Model};
use unitorm::{EntityId, MemoryConnection, MemoryDatabase, Reference, Shared, UnitOfWork, shared};

unitorm::entity! {
    pub struct City {
        pub name: String,
    }
}

unitorm::entity! {
    pub struct Person {
        pub name: String,
        pub surname: String,
        pub passport_number: Option<String>,
        pub age: i64,
        pub city: Reference<City>,
    }
}

unitorm::entity! {
    pub struct Reading {
        pub level: f64,
    }
}

/// Entity without a single persistable field.
#[derive(Debug, Clone)]
pub struct Marker {
    id: EntityId,
}

impl Model for Marker {
    const TABLE: &'static str = "Marker";

    fn fields() -> &'static [Field<Self>] {
        &[]
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn with_id(id: EntityId) -> Self {
        Self { id }
    }
}

pub const PERSON_COLUMNS: &str = r#""Id","Name","Surname","PassportNumber","Age","CityId""#;

pub fn person(name: &str, surname: &str, age: i64) -> Shared<Person> {
    let mut person = Person::new();
    person.name = name.into();
    person.surname = surname.into();
    person.age = age;
    shared(person)
}

pub fn city(name: &str) -> Shared<City> {
    let mut city = City::new();
    city.name = name.into();
    shared(city)
}

pub async fn seeded_database() -> Arc<MemoryDatabase> {
    let db = MemoryDatabase::named("tests");
    db.execute_sql(
        r#"CREATE TABLE "Person" (
            "Id" UUID NOT NULL,
            "Name" TEXT NOT NULL,
            "Surname" TEXT NOT NULL,
            "PassportNumber" VARCHAR(32),
            "Age" INTEGER,
            "CityId" UUID
        );
        CREATE TABLE "City" ("Id" UUID NOT NULL, "Name" TEXT NOT NULL);
        CREATE TABLE "Reading" ("Id" UUID NOT NULL, "Level" DOUBLE PRECISION);"#,
    )
    .await
    .unwrap();
    Arc::new(db)
}

pub fn connect(db: &Arc<MemoryDatabase>) -> Arc<MemoryConnection> {
    Arc::new(MemoryConnection::new(Arc::clone(db)))
}

pub fn unit_of_work(connection: &Arc<MemoryConnection>) -> UnitOfWork {
    UnitOfWork::from_connection(connection.clone())
}

/// A database, a connection to it and a unit of work over that connection.
pub async fn setup() -> (Arc<MemoryDatabase>, Arc<MemoryConnection>, UnitOfWork) {
    let db = seeded_database().await;
    let connection = connect(&db);
    let uow = unit_of_work(&connection);
    (db, connection, uow)
}

/// Text of the most recently executed command.
pub fn last_sql(connection: &MemoryConnection) -> String {
    connection
        .last_command()
        .unwrap()
        .map(|command| command.text().to_string())
        .unwrap_or_default()
}

pub fn statements(sql: &str) -> Vec<&str> {
    sql.split_terminator(';').collect()
}
