//! Table Registry
//!
//! Owns every table by name. Append-only: tables are created on demand and
//! live as long as the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Table;

/// Registry of named tables
///
/// ## Concurrency:
/// - `tables`: Protected by RwLock, held only for a lookup or an insert,
///   never across I/O and never while a table lock is being acquired
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table unless one with this name already exists
    ///
    /// Returns true if a new table was created.
    pub fn create_table(&self, name: &str) -> bool {
        let mut tables = self.tables.write();

        if tables.contains_key(name) {
            tracing::debug!("Table '{}' already exists", name);
            return false;
        }

        tables.insert(name.to_string(), Arc::new(Table::new(name)));
        tracing::info!("Created table '{}'", name);
        true
    }

    /// Look up a table by name
    pub fn find_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}
