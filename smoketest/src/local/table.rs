//! In-memory wide-column table store.

use crate::errors::AdminError;
use crate::resources::{TableAdmin, TableReader, TableRows};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug)]
struct Table {
    column_family: String,
    rows: TableRows,
}

/// Tables with a single column family each.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: DashMap<String, Table>,
}

impl InMemoryTableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one cell, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown table and `Rejected` for an unknown
    /// column family.
    pub fn put(
        &self,
        table: &str,
        row_key: &str,
        column_family: &str,
        column: &str,
        value: impl Into<String>,
    ) -> Result<(), AdminError> {
        let mut table = self.tables.get_mut(table).ok_or(AdminError::NotFound)?;
        if table.column_family != column_family {
            return Err(AdminError::Rejected(format!(
                "unknown column family '{column_family}'"
            )));
        }
        table
            .rows
            .entry(row_key.to_string())
            .or_default()
            .insert(column.to_string(), value.into());
        Ok(())
    }

    /// Returns true if the table exists.
    #[must_use]
    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }
}

#[async_trait]
impl TableAdmin for InMemoryTableStore {
    async fn create_table(&self, name: &str, column_family: &str) -> Result<(), AdminError> {
        if self.tables.contains_key(name) {
            return Err(AdminError::AlreadyExists);
        }
        self.tables.insert(
            name.to_string(),
            Table {
                column_family: column_family.to_string(),
                rows: TableRows::new(),
            },
        );
        Ok(())
    }

    async fn delete_table(&self, name: &str) -> Result<(), AdminError> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or(AdminError::NotFound)
    }
}

#[async_trait]
impl TableReader for InMemoryTableStore {
    async fn scan(&self, table: &str, column_family: &str) -> Result<TableRows, AdminError> {
        let table = self.tables.get(table).ok_or(AdminError::NotFound)?;
        if table.column_family != column_family {
            return Err(AdminError::Rejected(format!(
                "unknown column family '{column_family}'"
            )));
        }
        Ok(table.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_scan() {
        let store = InMemoryTableStore::new();
        store.create_table("WordCount", "cf").await.unwrap();

        store.put("WordCount", "apple", "cf", "count", "1").unwrap();
        store.put("WordCount", "apple", "cf", "count", "2").unwrap();

        let rows = store.scan("WordCount", "cf").await.unwrap();
        assert_eq!(rows["apple"]["count"], "2");
        assert!(store.put("WordCount", "apple", "other", "count", "1").is_err());
        assert!(store.scan("WordCount", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_create_is_idempotent_and_delete_reports_missing() {
        let store = InMemoryTableStore::new();
        store.create_table("t", "cf").await.unwrap();
        assert_eq!(store.create_table("t", "cf").await, Err(AdminError::AlreadyExists));

        store.delete_table("t").await.unwrap();
        assert!(!store.table_exists("t"));
        assert_eq!(store.delete_table("t").await, Err(AdminError::NotFound));
        assert_eq!(store.scan("t", "cf").await, Err(AdminError::NotFound));
    }
}
