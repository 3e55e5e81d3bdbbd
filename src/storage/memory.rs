use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use crate::command::Command;
use crate::core::{Column, DbError, Result, Value};
use crate::parser::{SqlParserAdapter, Statement};
use crate::result::QueryResult;
use super::{Catalog, ExecutionContext, ExecutorPipeline, TableSchema};

/// In-process table store that executes parameterized SQL batches.
///
/// A batch runs against a snapshot of the catalog. The snapshot replaces the live
/// catalog only if every statement succeeds, so a failing batch leaves no trace.
pub struct MemoryDatabase {
    name: String,
    catalog: RwLock<Catalog>,
    parser: SqlParserAdapter,
    pipeline: ExecutorPipeline,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            catalog: RwLock::new(Catalog::new()),
            parser: SqlParserAdapter::new(),
            pipeline: ExecutorPipeline::standard(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn create_table(&self, name: &str, columns: Vec<Column>) -> Result<()> {
        let mut catalog = self.catalog.write().await;
        catalog.create_table(TableSchema::new(name, columns))
    }

    pub async fn table_names(&self) -> Vec<String> {
        let catalog = self.catalog.read().await;
        catalog.list_tables().into_iter().map(String::from).collect()
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        let catalog = self.catalog.read().await;
        Ok(catalog.get_table(table)?.row_count())
    }

    /// Run unparameterized SQL, typically DDL used to seed a store.
    pub async fn execute_sql(&self, sql: &str) -> Result<Vec<QueryResult>> {
        self.execute(&Command::new(sql)).await
    }

    /// Run every statement of `command` atomically, one result per statement.
    pub async fn execute(&self, command: &Command) -> Result<Vec<QueryResult>> {
        let statements = self.parser.parse(command.text())?;
        self.run_batch(&statements, command).await
    }

    /// Result of the first query in `command`. Every statement still runs.
    pub async fn query(&self, command: &Command) -> Result<QueryResult> {
        let statements = self.parser.parse(command.text())?;
        let Some(index) = statements
            .iter()
            .position(|stmt| matches!(stmt, Statement::Query(_)))
        else {
            return Err(DbError::UnsupportedOperation(
                "Command does not contain a query".into(),
            ));
        };

        let mut results = self.run_batch(&statements, command).await?;
        Ok(results.swap_remove(index))
    }

    /// Total rows written by `command`.
    pub async fn execute_non_query(&self, command: &Command) -> Result<u64> {
        let results = self.execute(command).await?;
        Ok(results.iter().map(|result| result.affected_rows).sum())
    }

    async fn run_batch(&self, statements: &[Statement], command: &Command) -> Result<Vec<QueryResult>> {
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let parameters: HashMap<String, Value> = command
            .parameters()
            .iter()
            .map(|parameter| (parameter.name.clone(), parameter.value.clone()))
            .collect();

        let mut live = self.catalog.write().await;
        let mut snapshot = live.clone();
        let mut results = Vec::with_capacity(statements.len());
        {
            let mut ctx = ExecutionContext {
                catalog: &mut snapshot,
                parameters: &parameters,
            };
            for stmt in statements {
                match self.pipeline.execute(stmt, &mut ctx).await {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        debug!(
                            database = %self.name,
                            table = stmt.table_name(),
                            error = %err,
                            "batch rolled back"
                        );
                        return Err(err);
                    }
                }
            }
        }
        *live = snapshot;

        debug!(database = %self.name, statements = results.len(), "batch applied");
        Ok(results)
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryDatabase {
        let db = MemoryDatabase::named("test");
        db.execute_sql(r#"CREATE TABLE "City" ("Id" UUID NOT NULL, "Name" TEXT)"#)
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_parameters_bind_by_name() {
        let db = seeded().await;
        let id = uuid::Uuid::new_v4();
        let insert = Command::new(r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);"#)
            .with_parameter("$1", id)
            .with_parameter("$2", "Oslo");
        assert_eq!(db.execute_non_query(&insert).await.unwrap(), 1);

        let result = db
            .query(&Command::new(r#"SELECT "Name" FROM "City";"#))
            .await
            .unwrap();
        assert_eq!(result.get(0, "Name"), Some(&Value::Text("Oslo".into())));
    }

    #[tokio::test]
    async fn test_failed_batch_is_rolled_back() {
        let db = seeded().await;
        let batch = Command::new(
            r#"INSERT INTO "City" ("Id","Name") VALUES ($1,$2);INSERT INTO "City" ("Id","Name") VALUES ($3,$4);"#,
        )
        .with_parameter("$1", uuid::Uuid::new_v4())
        .with_parameter("$2", "Oslo")
        .with_parameter("$3", uuid::Uuid::new_v4());

        assert!(matches!(
            db.execute(&batch).await,
            Err(DbError::UnboundParameter(name)) if name == "$4"
        ));
        assert_eq!(db.row_count("City").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_requires_select() {
        let db = seeded().await;
        let err = db
            .query(&Command::new(r#"DELETE FROM "City";"#))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UnsupportedOperation(_)));
    }
}
