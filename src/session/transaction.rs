//! Transaction state
//!
//! Holds the lock of every table touched since BEGIN. Locks are taken with
//! `try_lock` only, so a transaction never waits behind another connection;
//! contention fails the transaction instead.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::{Result, TxkvError};
use crate::store::{Table, TableGuard};

/// An open transaction and the tables it has locked
#[derive(Debug, Default)]
pub struct Transaction {
    /// Touched tables by name, each still locked
    tables: BTreeMap<String, TableGuard>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `table` for the rest of the transaction, unless already held
    pub fn acquire(&mut self, table: &Table) -> Result<&mut TableGuard> {
        match self.tables.entry(table.name().to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let guard = table.try_lock().ok_or_else(|| {
                    TxkvError::FailedTransaction(format!(
                        "Could not lock table '{}'",
                        table.name()
                    ))
                })?;
                tracing::trace!("Transaction locked table '{}'", table.name());
                Ok(entry.insert(guard))
            }
        }
    }

    /// Names of the touched tables, sorted
    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Commit and unlock every touched table
    pub fn commit(mut self) {
        for (_, mut guard) in std::mem::take(&mut self.tables) {
            guard.commit_changes();
            guard.unlock();
        }
    }

    /// Roll back and unlock every touched table
    pub fn rollback(mut self) {
        self.rollback_all();
    }

    fn rollback_all(&mut self) {
        for (_, mut guard) in std::mem::take(&mut self.tables) {
            guard.rollback_changes();
            guard.unlock();
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.tables.is_empty() {
            tracing::debug!(
                "Rolling back {} table(s) of an unfinished transaction",
                self.tables.len()
            );
            self.rollback_all();
        }
    }
}
