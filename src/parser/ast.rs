use crate::core::{Column, Value};

/// Root statement type
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Query(QueryStmt),
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table_name: String,
    pub columns: Vec<Column>,
    pub if_not_exists: bool,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table_name: String,
    /// `None` means every column in schema order.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Vec<Expr>>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table_name: String,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table_name: String,
    pub selection: Option<Predicate>,
}

/// Single-table SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStmt {
    pub table_name: String,
    pub projection: Projection,
    pub selection: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Wildcard,
    Columns(Vec<String>),
}

/// Scalar operand
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Positional parameter such as `$1`.
    Placeholder(String),
    Column(String),
}

/// Row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Expr, Expr),
    In {
        expr: Expr,
        list: Vec<Expr>,
        negated: bool,
    },
    And(Box<Predicate>, Box<Predicate>),
}

impl Statement {
    pub fn table_name(&self) -> &str {
        match self {
            Statement::CreateTable(stmt) => &stmt.table_name,
            Statement::Insert(stmt) => &stmt.table_name,
            Statement::Update(stmt) => &stmt.table_name,
            Statement::Delete(stmt) => &stmt.table_name,
            Statement::Query(stmt) => &stmt.table_name,
        }
    }
}
