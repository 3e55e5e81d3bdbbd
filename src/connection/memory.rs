use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tracing::trace;
use crate::command::Command;
use crate::core::{DbError, Result};
use crate::result::QueryResult;
use crate::storage::MemoryDatabase;
use super::Connection;

/// Counters describing how a connection has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub opened: u64,
    pub closed: u64,
    pub executed: u64,
}

/// [`Connection`] over an in-process [`MemoryDatabase`].
///
/// Several connections may share one database. Every executed command is kept in a
/// journal so callers can inspect exactly what was sent.
pub struct MemoryConnection {
    database: Arc<MemoryDatabase>,
    open: AtomicBool,
    opened: AtomicU64,
    closed: AtomicU64,
    executed: AtomicU64,
    journal: Mutex<Vec<Command>>,
}

impl MemoryConnection {
    pub fn new(database: Arc<MemoryDatabase>) -> Self {
        Self {
            database,
            open: AtomicBool::new(false),
            opened: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn database(&self) -> &Arc<MemoryDatabase> {
        &self.database
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            opened: self.opened.load(Ordering::SeqCst),
            closed: self.closed.load(Ordering::SeqCst),
            executed: self.executed.load(Ordering::SeqCst),
        }
    }

    /// Commands executed so far, oldest first.
    pub fn executed_commands(&self) -> Result<Vec<Command>> {
        Ok(self.journal.lock()?.clone())
    }

    pub fn last_command(&self) -> Result<Option<Command>> {
        Ok(self.journal.lock()?.last().cloned())
    }

    fn begin(&self, command: &Command) -> Result<()> {
        if !self.is_open() {
            return Err(DbError::ConnectionClosed);
        }
        trace!(
            database = self.database.name(),
            parameters = command.parameters().len(),
            sql = command.text(),
            "executing command"
        );
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.journal.lock()?.push(command.clone());
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn open(&self) -> Result<()> {
        self.open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DbError::ExecutionError("Connection is already open".into()))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Err(DbError::ConnectionClosed);
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn execute_reader(&self, command: &Command) -> Result<QueryResult> {
        self.begin(command)?;
        self.database.query(command).await
    }

    async fn execute_non_query(&self, command: &Command) -> Result<u64> {
        self.begin(command)?;
        self.database.execute_non_query(command).await
    }
}
