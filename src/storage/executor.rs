use std::collections::HashMap;
use async_trait::async_trait;
use crate::core::{DataType, DbError, Result, Row, Value};
use crate::parser::ast::{Expr, Predicate, Projection, Statement};
use crate::result::QueryResult;
use super::{Catalog, TableSchema};

/// State shared by every statement of one batch.
pub struct ExecutionContext<'a> {
    pub catalog: &'a mut Catalog,
    pub parameters: &'a HashMap<String, Value>,
}

impl ExecutionContext<'_> {
    fn operand(&self, expr: &Expr, table: &TableSchema, row: &Row) -> Result<(Value, Option<DataType>)> {
        match expr {
            Expr::Literal(value) => Ok((value.clone(), None)),
            Expr::Placeholder(name) => self
                .parameters
                .get(name)
                .cloned()
                .map(|value| (value, None))
                .ok_or_else(|| DbError::UnboundParameter(name.clone())),
            Expr::Column(name) => {
                let index = table.column_index(name)?;
                let data_type = table.schema().columns()[index].data_type;
                let value = row.get(index).cloned().ok_or_else(|| {
                    DbError::ExecutionError(format!("Column '{}' cannot be referenced here", name))
                })?;
                Ok((value, Some(data_type)))
            }
        }
    }

    /// Evaluate a scalar against `row`.
    pub fn evaluate(&self, expr: &Expr, table: &TableSchema, row: &Row) -> Result<Value> {
        self.operand(expr, table, row).map(|(value, _)| value)
    }

    /// Whether `row` satisfies `predicate`. NULL never compares equal.
    pub fn matches(&self, predicate: &Predicate, table: &TableSchema, row: &Row) -> Result<bool> {
        match predicate {
            Predicate::Eq(left, right) => {
                let left = self.operand(left, table, row)?;
                let right = self.operand(right, table, row)?;
                Ok(values_equal(left, right))
            }
            Predicate::In { expr, list, negated } => {
                let probe = self.operand(expr, table, row)?;
                if probe.0.is_null() {
                    return Ok(false);
                }
                let mut found = false;
                for item in list {
                    if values_equal(probe.clone(), self.operand(item, table, row)?) {
                        found = true;
                        break;
                    }
                }
                Ok(found != *negated)
            }
            Predicate::And(left, right) => {
                Ok(self.matches(left, table, row)? && self.matches(right, table, row)?)
            }
        }
    }

    fn filter(&self, selection: Option<&Predicate>, table: &TableSchema, row: &Row) -> Result<bool> {
        selection.map_or(Ok(true), |predicate| self.matches(predicate, table, row))
    }
}

fn values_equal(left: (Value, Option<DataType>), right: (Value, Option<DataType>)) -> bool {
    if left.0.is_null() || right.0.is_null() {
        return false;
    }
    let hint = left.1.or(right.1);
    align(left.0, hint) == align(right.0, hint)
}

/// Bring a loosely typed operand (a text UUID, say) to the column's type.
fn align(value: Value, hint: Option<DataType>) -> Value {
    match hint {
        Some(data_type) if !data_type.is_compatible(&value) => {
            data_type.coerce(value.clone()).unwrap_or(value)
        }
        _ => value,
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, stmt: &Statement) -> bool;

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult>;
}

pub struct ExecutorPipeline {
    executors: Vec<Box<dyn Executor>>,
}

impl ExecutorPipeline {
    pub fn new() -> Self {
        Self {
            executors: Vec::new(),
        }
    }

    /// Pipeline handling every statement the parser produces.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(CreateTableExecutor));
        pipeline.register(Box::new(InsertExecutor));
        pipeline.register(Box::new(UpdateExecutor));
        pipeline.register(Box::new(DeleteExecutor));
        pipeline.register(Box::new(QueryExecutor));
        pipeline
    }

    pub fn register(&mut self, executor: Box<dyn Executor>) {
        self.executors.push(executor);
    }

    pub async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        for executor in &self.executors {
            if executor.can_handle(stmt) {
                tracing::trace!(executor = executor.name(), table = stmt.table_name(), "dispatching statement");
                return executor.execute(stmt, ctx).await;
            }
        }

        Err(DbError::UnsupportedOperation(
            "No executor found for statement".into(),
        ))
    }
}

impl Default for ExecutorPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

pub struct CreateTableExecutor;

#[async_trait]
impl Executor for CreateTableExecutor {
    fn name(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::CreateTable(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::CreateTable(create) = stmt else {
            return Err(DbError::ExecutionError("Expected CREATE TABLE".into()));
        };

        if create.if_not_exists && ctx.catalog.table_exists(&create.table_name) {
            return Ok(QueryResult::empty());
        }
        ctx.catalog
            .create_table(TableSchema::new(&create.table_name, create.columns.clone()))?;
        Ok(QueryResult::empty())
    }
}

pub struct InsertExecutor;

#[async_trait]
impl Executor for InsertExecutor {
    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Insert(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Insert(insert) = stmt else {
            return Err(DbError::ExecutionError("Expected INSERT".into()));
        };

        let schema = ctx.catalog.get_table(&insert.table_name)?.schema().clone();
        let positions = match &insert.columns {
            Some(columns) => columns
                .iter()
                .map(|column| schema.column_index(column))
                .collect::<Result<Vec<_>>>()?,
            None => (0..schema.schema().column_count()).collect(),
        };

        let empty_row = Row::new();
        let mut rows = Vec::with_capacity(insert.values.len());
        for values in &insert.values {
            if values.len() != positions.len() {
                return Err(DbError::ExecutionError(format!(
                    "INSERT into '{}' has {} columns but {} values",
                    insert.table_name,
                    positions.len(),
                    values.len()
                )));
            }
            let mut row = vec![Value::Null; schema.schema().column_count()];
            for (position, expr) in positions.iter().zip(values) {
                row[*position] = ctx.evaluate(expr, &schema, &empty_row)?;
            }
            rows.push(row);
        }

        let table = ctx.catalog.get_table_mut(&insert.table_name)?;
        let affected = rows.len() as u64;
        for row in rows {
            table.insert(row)?;
        }
        Ok(QueryResult::affected(affected))
    }
}

pub struct UpdateExecutor;

#[async_trait]
impl Executor for UpdateExecutor {
    fn name(&self) -> &'static str {
        "UPDATE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Update(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Update(update) = stmt else {
            return Err(DbError::ExecutionError("Expected UPDATE".into()));
        };

        let schema = ctx.catalog.get_table(&update.table_name)?.schema().clone();
        let assignments = update
            .assignments
            .iter()
            .map(|assignment| {
                schema
                    .column_index(&assignment.column)
                    .map(|index| (index, &assignment.value))
            })
            .collect::<Result<Vec<_>>>()?;

        // Evaluate against the current rows first, then write.
        let mut changes = Vec::new();
        for row in ctx.catalog.get_table(&update.table_name)?.scan() {
            if !ctx.filter(update.selection.as_ref(), &schema, row)? {
                changes.push(None);
                continue;
            }
            let mut new_row = row.clone();
            for (index, expr) in &assignments {
                new_row[*index] = ctx.evaluate(expr, &schema, row)?;
            }
            changes.push(Some(new_row));
        }

        let mut changes = changes.into_iter();
        let table = ctx.catalog.get_table_mut(&update.table_name)?;
        let affected = table.update(|_| Ok(changes.next().flatten()))?;
        Ok(QueryResult::affected(affected))
    }
}

pub struct DeleteExecutor;

#[async_trait]
impl Executor for DeleteExecutor {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Delete(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Delete(delete) = stmt else {
            return Err(DbError::ExecutionError("Expected DELETE".into()));
        };

        let schema = ctx.catalog.get_table(&delete.table_name)?.schema().clone();
        let doomed = ctx
            .catalog
            .get_table(&delete.table_name)?
            .scan()
            .map(|row| ctx.filter(delete.selection.as_ref(), &schema, row))
            .collect::<Result<Vec<_>>>()?;

        let mut doomed = doomed.into_iter();
        let table = ctx.catalog.get_table_mut(&delete.table_name)?;
        let affected = table.retain(|_| Ok(!doomed.next().unwrap_or(false)))?;
        Ok(QueryResult::affected(affected))
    }
}

pub struct QueryExecutor;

#[async_trait]
impl Executor for QueryExecutor {
    fn name(&self) -> &'static str {
        "SELECT"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Query(_))
    }

    async fn execute(&self, stmt: &Statement, ctx: &mut ExecutionContext<'_>) -> Result<QueryResult> {
        let Statement::Query(query) = stmt else {
            return Err(DbError::ExecutionError("Expected SELECT".into()));
        };

        let table = ctx.catalog.get_table(&query.table_name)?;
        let schema = table.schema();
        let (columns, positions) = match &query.projection {
            Projection::Wildcard => {
                let columns = schema.column_names();
                let positions = (0..columns.len()).collect::<Vec<_>>();
                (columns, positions)
            }
            Projection::Columns(columns) => {
                let positions = columns
                    .iter()
                    .map(|column| schema.column_index(column))
                    .collect::<Result<Vec<_>>>()?;
                (columns.clone(), positions)
            }
        };

        let mut rows: Vec<Row> = Vec::new();
        for row in table.scan() {
            if ctx.filter(query.selection.as_ref(), schema, row)? {
                rows.push(positions.iter().map(|index| row[*index].clone()).collect());
            }
        }
        Ok(QueryResult::new(columns, rows))
    }
}
