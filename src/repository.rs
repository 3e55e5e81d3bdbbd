//! Read path: full-table SELECTs materialized into fresh entity instances.

use std::collections::BTreeSet;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;
use crate::command::Command;
use crate::connection::{Connection, OpenConnection};
use crate::core::{OrmError, OrmResult};
use crate::entity::{EntityId, Field, Model};
use crate::metadata::{model_columns, quote, resolve_column, to_csv};
use crate::result::QueryResult;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Read every row of `M`'s table.
    ///
    /// With `columns` absent or empty every declared column is read. The returned
    /// instances are new objects, not tracked by anyone.
    async fn read<M: Model>(&self, columns: Option<&BTreeSet<String>>) -> OrmResult<Vec<M>>;
}

/// [`Repository`] issuing SQL over a shared [`Connection`].
#[derive(Clone)]
pub struct SqlRepository {
    connection: Arc<dyn Connection>,
}

impl SqlRepository {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }
}

#[async_trait]
impl Repository for SqlRepository {
    async fn read<M: Model>(&self, columns: Option<&BTreeSet<String>>) -> OrmResult<Vec<M>> {
        let requested: Vec<String> = match columns {
            Some(columns) if !columns.is_empty() => columns.iter().cloned().collect(),
            _ => model_columns::<M>(),
        };
        let column_list = to_csv(&requested);
        if column_list.is_empty() {
            return Err(OrmError::EmptyOperation(format!(
                "{} does not expose any readable fields",
                M::TABLE
            )));
        }

        // Fail on unknown columns before touching the connection.
        let targets = requested
            .iter()
            .map(|column| resolve_column::<M>(column).map(|field| (column.as_str(), field)))
            .collect::<OrmResult<Vec<_>>>()?;

        let command = Command::new(format!("SELECT {} FROM {};", column_list, quote(M::TABLE)));
        let result = {
            let connection = OpenConnection::open(self.connection.as_ref())?;
            connection.execute_reader(&command).await?
        };
        debug!(entity_type = M::TABLE, rows = result.row_count(), "read rows");

        materialize(&result, &targets)
    }
}

fn materialize<M: Model>(
    result: &QueryResult,
    targets: &[(&str, &'static Field<M>)],
) -> OrmResult<Vec<M>> {
    let positions = targets
        .iter()
        .map(|(column, field)| {
            result
                .column_index(column)
                .map(|index| (index, *field))
                .ok_or_else(|| {
                    OrmError::SchemaMismatch(format!(
                        "Column '{}' missing from the {} result set",
                        column,
                        M::TABLE
                    ))
                })
        })
        .collect::<OrmResult<Vec<_>>>()?;

    result
        .rows()
        .iter()
        .map(|row| {
            let mut entity = M::with_id(EntityId::new());
            for (index, field) in &positions {
                let value = row.get(*index).cloned().unwrap_or_default();
                (field.set)(&mut entity, value).map_err(|err| {
                    OrmError::SchemaMismatch(format!("{}.{}: {}", M::TABLE, field.meta.name, err))
                })?;
            }
            Ok(entity)
        })
        .collect()
}
