use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use crate::core::{Column, DataType, DbError, Result, Value};
use crate::parser::ast::*;

/// Converts SQL text into the statement subset the memory store executes.
pub struct SqlParserAdapter {
    dialect: PostgreSqlDialect,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a batch of `;`-separated statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        let external_stmts = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| DbError::ParseError(e.to_string()))?;

        external_stmts
            .into_iter()
            .map(|stmt| self.convert_statement(stmt))
            .collect()
    }

    fn convert_statement(&self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::CreateTable(create) => {
                Ok(Statement::CreateTable(self.convert_create_table(create)?))
            }
            sql_ast::Statement::Insert(insert) => {
                Ok(Statement::Insert(self.convert_insert(insert)?))
            }
            sql_ast::Statement::Query(query) => {
                Ok(Statement::Query(self.convert_query(*query)?))
            }
            sql_ast::Statement::Delete(delete) => {
                Ok(Statement::Delete(self.convert_delete(delete)?))
            }
            sql_ast::Statement::Update { table, assignments, selection, .. } => {
                Ok(Statement::Update(self.convert_update(table, assignments, selection)?))
            }
            _ => Err(DbError::UnsupportedOperation(format!(
                "Statement type not supported: {}",
                stmt
            ))),
        }
    }

    fn convert_create_table(&self, create: sql_ast::CreateTable) -> Result<CreateTableStmt> {
        let table_name = extract_table_name(&create.name)?;
        let columns = create
            .columns
            .into_iter()
            .map(|col| self.convert_column_def(col))
            .collect::<Result<Vec<_>>>()?;

        Ok(CreateTableStmt {
            table_name,
            columns,
            if_not_exists: create.if_not_exists,
        })
    }

    fn convert_column_def(&self, col: sql_ast::ColumnDef) -> Result<Column> {
        let data_type = self.convert_data_type(&col.data_type)?;
        let not_null = col
            .options
            .iter()
            .any(|opt| matches!(opt.option, sql_ast::ColumnOption::NotNull));

        let column = Column::new(col.name.value, data_type);
        Ok(if not_null { column.not_null() } else { column })
    }

    fn convert_data_type(&self, dt: &sql_ast::DataType) -> Result<DataType> {
        match dt {
            sql_ast::DataType::Int(_)
            | sql_ast::DataType::Integer(_)
            | sql_ast::DataType::BigInt(_) => Ok(DataType::Integer),

            sql_ast::DataType::Float(_)
            | sql_ast::DataType::Double(_)
            | sql_ast::DataType::DoublePrecision
            | sql_ast::DataType::Real => Ok(DataType::Float),

            sql_ast::DataType::Text
            | sql_ast::DataType::Varchar(_)
            | sql_ast::DataType::Char(_)
            | sql_ast::DataType::String(_) => Ok(DataType::Text),

            sql_ast::DataType::Boolean
            | sql_ast::DataType::Bool => Ok(DataType::Boolean),

            sql_ast::DataType::Uuid => Ok(DataType::Uuid),

            _ => Err(DbError::TypeMismatch(format!(
                "Unsupported data type: {}",
                dt
            ))),
        }
    }

    fn convert_insert(&self, insert: sql_ast::Insert) -> Result<InsertStmt> {
        let table_name = match &insert.table {
            sql_ast::TableObject::TableName(name) => extract_table_name(name)?,
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "Unsupported INSERT target: {:?}",
                    other
                )));
            }
        };

        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.into_iter().map(|id| id.value).collect())
        };

        let Some(source) = insert.source else {
            return Err(DbError::ParseError("INSERT requires a VALUES clause".into()));
        };
        let sql_ast::SetExpr::Values(vals) = *source.body else {
            return Err(DbError::UnsupportedOperation(
                "Only VALUES clause supported".into(),
            ));
        };

        let values = vals
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|expr| self.convert_expr(expr))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InsertStmt {
            table_name,
            columns,
            values,
        })
    }

    fn convert_delete(&self, delete: sql_ast::Delete) -> Result<DeleteStmt> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let Some(table) = tables.into_iter().next() else {
            return Err(DbError::ParseError("DELETE requires table name".into()));
        };
        let table_name = self.convert_relation(table.relation, "DELETE")?;

        let selection = delete
            .selection
            .map(|expr| self.convert_predicate(expr))
            .transpose()?;

        Ok(DeleteStmt {
            table_name,
            selection,
        })
    }

    fn convert_update(
        &self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> Result<UpdateStmt> {
        let table_name = self.convert_relation(table.relation, "UPDATE")?;

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match &assign.target {
                    sql_ast::AssignmentTarget::ColumnName(col_name) if col_name.0.len() == 1 => {
                        extract_table_name(col_name)?
                    }
                    _ => {
                        return Err(DbError::UnsupportedOperation(
                            "Only simple column names supported in UPDATE".into(),
                        ));
                    }
                };

                let value = self.convert_expr(assign.value)?;

                Ok(Assignment { column, value })
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = selection
            .map(|expr| self.convert_predicate(expr))
            .transpose()?;

        Ok(UpdateStmt {
            table_name,
            assignments,
            selection,
        })
    }

    fn convert_query(&self, query: sql_ast::Query) -> Result<QueryStmt> {
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::UnsupportedOperation(
                "Only SELECT queries supported".into(),
            ));
        };
        let select = *select;

        if select.from.len() != 1 {
            return Err(DbError::UnsupportedOperation(
                "SELECT must read exactly one table".into(),
            ));
        }
        let mut from = select.from;
        let table = from.remove(0);
        if !table.joins.is_empty() {
            return Err(DbError::UnsupportedOperation("JOIN not supported".into()));
        }
        let table_name = self.convert_relation(table.relation, "SELECT")?;

        let selection = select
            .selection
            .map(|expr| self.convert_predicate(expr))
            .transpose()?;

        let mut columns = Vec::new();
        for item in select.projection {
            match item {
                sql_ast::SelectItem::Wildcard(_) => {
                    return Ok(QueryStmt {
                        table_name,
                        projection: Projection::Wildcard,
                        selection,
                    });
                }
                sql_ast::SelectItem::UnnamedExpr(expr) => match self.convert_expr(expr)? {
                    Expr::Column(name) => columns.push(name),
                    other => {
                        return Err(DbError::UnsupportedOperation(format!(
                            "Only column projections supported, got {:?}",
                            other
                        )));
                    }
                },
                _ => {
                    return Err(DbError::UnsupportedOperation(
                        "Unsupported select item".into(),
                    ));
                }
            }
        }

        Ok(QueryStmt {
            table_name,
            projection: Projection::Columns(columns),
            selection,
        })
    }

    fn convert_relation(&self, relation: sql_ast::TableFactor, context: &str) -> Result<String> {
        match relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(&name),
            _ => Err(DbError::UnsupportedOperation(format!(
                "Complex table references not supported in {}",
                context
            ))),
        }
    }

    fn convert_predicate(&self, expr: sql_ast::Expr) -> Result<Predicate> {
        match expr {
            sql_ast::Expr::Nested(inner) => self.convert_predicate(*inner),
            sql_ast::Expr::BinaryOp { left, op: sql_ast::BinaryOperator::And, right } => {
                Ok(Predicate::And(
                    Box::new(self.convert_predicate(*left)?),
                    Box::new(self.convert_predicate(*right)?),
                ))
            }
            sql_ast::Expr::BinaryOp { left, op: sql_ast::BinaryOperator::Eq, right } => {
                Ok(Predicate::Eq(self.convert_expr(*left)?, self.convert_expr(*right)?))
            }
            sql_ast::Expr::InList { expr, list, negated } => Ok(Predicate::In {
                expr: self.convert_expr(*expr)?,
                list: list
                    .into_iter()
                    .map(|item| self.convert_expr(item))
                    .collect::<Result<Vec<_>>>()?,
                negated,
            }),
            other => Err(DbError::UnsupportedOperation(format!(
                "Unsupported predicate: {}",
                other
            ))),
        }
    }

    fn convert_expr(&self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::CompoundIdentifier(mut idents) => idents
                .pop()
                .map(|ident| Expr::Column(ident.value))
                .ok_or_else(|| DbError::ParseError("Empty identifier".into())),
            sql_ast::Expr::Nested(inner) => self.convert_expr(*inner),
            sql_ast::Expr::Value(value_with_span) => self.convert_value(value_with_span.value),
            sql_ast::Expr::UnaryOp { op: sql_ast::UnaryOperator::Minus, expr } => {
                match self.convert_expr(*expr)? {
                    Expr::Literal(Value::Integer(n)) => Ok(Expr::Literal(Value::Integer(-n))),
                    Expr::Literal(Value::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                    other => Err(DbError::UnsupportedOperation(format!(
                        "Cannot negate {:?}",
                        other
                    ))),
                }
            }
            other => Err(DbError::UnsupportedOperation(format!(
                "Unsupported expression: {}",
                other
            ))),
        }
    }

    fn convert_value(&self, value: sql_ast::Value) -> Result<Expr> {
        let literal = match value {
            sql_ast::Value::Placeholder(name) => return Ok(Expr::Placeholder(name)),
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    Value::Integer(i)
                } else {
                    n.parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| DbError::ParseError(format!("Invalid number: {}", n)))?
                }
            }
            sql_ast::Value::SingleQuotedString(s) => Value::Text(s),
            sql_ast::Value::Boolean(b) => Value::Boolean(b),
            sql_ast::Value::Null => Value::Null,
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "Unsupported literal: {}",
                    other
                )));
            }
        };
        Ok(Expr::Literal(literal))
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Last part of a possibly qualified name, with quoting removed.
fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    match name.0.last() {
        Some(sql_ast::ObjectNamePart::Identifier(ident)) => Ok(ident.value.clone()),
        Some(other) => Err(DbError::UnsupportedOperation(format!(
            "Unsupported object name: {}",
            other
        ))),
        None => Err(DbError::ParseError("Invalid table name".into())),
    }
}
