use crate::core::{Column, DbError, Result, Row, Schema, Value};

/// Table name plus its column layout.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .columns()
            .iter()
            .map(|column| column.name.clone())
            .collect()
    }

    /// Position of `column`, or `ColumnNotFound`.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.schema
            .find_column_index(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string(), self.name.clone()))
    }
}

/// Row storage for one table. Rows live in a persistent vector so catalog snapshots
/// share them until written.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: im::Vector<Row>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: im::Vector::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn scan(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Validate, coerce and append a full row.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        let row = self.validate_row(row)?;
        self.rows.push_back(row);
        Ok(())
    }

    /// Drop every row `keep` rejects; returns how many rows were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> Result<u64>
    where
        F: FnMut(&Row) -> Result<bool>,
    {
        let mut kept = im::Vector::new();
        let mut removed = 0;
        for row in self.rows.iter() {
            if keep(row)? {
                kept.push_back(row.clone());
            } else {
                removed += 1;
            }
        }
        self.rows = kept;
        Ok(removed)
    }

    /// Apply `change` to each row; it returns the new row or `None` to leave it alone.
    pub fn update<F>(&mut self, mut change: F) -> Result<u64>
    where
        F: FnMut(&Row) -> Result<Option<Row>>,
    {
        let mut updated = 0;
        for index in 0..self.rows.len() {
            let Some(current) = self.rows.get(index) else {
                continue;
            };
            if let Some(new_row) = change(current)? {
                let new_row = self.validate_row(new_row)?;
                self.rows.set(index, new_row);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn validate_row(&self, row: Row) -> Result<Row> {
        let columns = self.schema.schema().columns();
        if row.len() != columns.len() {
            return Err(DbError::ExecutionError(format!(
                "Table '{}' expects {} values, got {}",
                self.schema.name(),
                columns.len(),
                row.len()
            )));
        }

        columns
            .iter()
            .zip(row)
            .map(|(column, value)| column.accept(value))
            .collect::<Result<Vec<Value>>>()
    }
}
