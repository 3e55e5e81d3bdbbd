pub mod memory;

use std::ops::Deref;
use async_trait::async_trait;
use tracing::warn;
use crate::command::Command;
use crate::core::Result;
use crate::result::QueryResult;

pub use memory::{ConnectionStats, MemoryConnection};

/// Database connection the unit of work and repository talk to.
///
/// Opening and closing are cheap and synchronous. Callers open immediately before a
/// statement and close right after; use [`OpenConnection`] to make that scoped.
#[async_trait]
pub trait Connection: Send + Sync {
    fn open(&self) -> Result<()>;

    fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Execute a command and return the rows of its query.
    async fn execute_reader(&self, command: &Command) -> Result<QueryResult>;

    /// Execute a command and return the number of rows written.
    async fn execute_non_query(&self, command: &Command) -> Result<u64>;
}

/// An opened connection that is closed when dropped, on every exit path.
pub struct OpenConnection<'a> {
    connection: &'a dyn Connection,
}

impl<'a> OpenConnection<'a> {
    pub fn open(connection: &'a dyn Connection) -> Result<Self> {
        connection.open()?;
        Ok(Self { connection })
    }
}

impl<'a> Deref for OpenConnection<'a> {
    type Target = dyn Connection + 'a;

    fn deref(&self) -> &Self::Target {
        self.connection
    }
}

impl Drop for OpenConnection<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.connection.close() {
            warn!(error = %err, "failed to close connection");
        }
    }
}
