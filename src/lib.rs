// ============================================================================
// unitorm: change-tracking unit of work over parameterized SQL
// ============================================================================

pub mod command;
pub mod connection;
pub mod core;
pub mod entity;
pub mod metadata;
pub mod parser;
pub mod repository;
pub mod result;
pub mod storage;
pub mod unit_of_work;
mod macros;

#[doc(hidden)]
pub use paste;

// Re-export main types for convenience
pub use command::{Command, CommandBuilder, Parameter};
pub use connection::{Connection, ConnectionStats, MemoryConnection, OpenConnection};
pub use crate::core::{Column, DataType, DbError, OrmError, OrmResult, Result, Value};
pub use entity::{Entity, EntityId, Model, Reference, Shared, shared};
pub use repository::{Repository, SqlRepository};
pub use result::QueryResult;
pub use storage::MemoryDatabase;
pub use unit_of_work::{EntityState, TrackedEntity, UnitOfWork, UnitOfWorkConfig};
