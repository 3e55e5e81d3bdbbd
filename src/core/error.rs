use thiserror::Error;

/// Errors raised by a driver or the table store behind it.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Parameter '{0}' is not bound")]
    UnboundParameter(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

/// Errors raised by the tracking layer: unit of work, command builder and repository.
#[derive(Error, Debug)]
pub enum OrmError {
    /// A required argument is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested or derived field does not exist on the target type.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A statement would have been rendered without fields, parameters or values.
    #[error("Empty operation: {0}")]
    EmptyOperation(String),

    /// The tracking bookkeeping is inconsistent.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

pub type OrmResult<T> = std::result::Result<T, OrmError>;

impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
