use crate::core::{DbError, Result};
use super::{Table, TableSchema};

/// All tables of a database.
///
/// Cloning is cheap: the map and row vectors are persistent structures, so a batch can
/// run against a clone and the clone replaces the original only when the batch succeeds.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: im::HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.name().to_string();
        if self.tables.contains_key(&name) {
            return Err(DbError::TableExists(name));
        }
        self.tables.insert(name, Table::new(schema));
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, Value};

    #[test]
    fn test_clone_is_isolated() {
        let mut catalog = Catalog::new();
        catalog
            .create_table(TableSchema::new("City", vec![Column::new("Name", DataType::Text)]))
            .unwrap();

        let mut snapshot = catalog.clone();
        snapshot
            .get_table_mut("City")
            .unwrap()
            .insert(vec![Value::Text("Oslo".into())])
            .unwrap();

        assert_eq!(catalog.get_table("City").unwrap().row_count(), 0);
        assert_eq!(snapshot.get_table("City").unwrap().row_count(), 1);
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = Catalog::new();
        catalog.create_table(TableSchema::new("City", vec![])).unwrap();
        assert!(matches!(
            catalog.create_table(TableSchema::new("City", vec![])),
            Err(DbError::TableExists(_))
        ));
        assert!(matches!(catalog.get_table("Town"), Err(DbError::TableNotFound(_))));
    }
}
