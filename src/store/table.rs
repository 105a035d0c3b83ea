//! Table implementation
//!
//! A named key/value map with a committed and a tentative view behind a
//! single mutex. The lock is exposed in two modes, blocking and non-blocking,
//! and every data operation is a method on the guard so it can only run while
//! the lock is held.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::error::{Result, TxkvError};

/// The two views of a table's data
#[derive(Debug, Default)]
struct Views {
    /// Last committed data, restored on rollback
    committed: BTreeMap<String, String>,

    /// Working data, read first and written by `set`
    tentative: BTreeMap<String, String>,
}

/// A named table
///
/// Tables are created once by the registry and never destroyed.
#[derive(Debug)]
pub struct Table {
    name: Arc<str>,
    views: Arc<Mutex<Views>>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            views: Arc::new(Mutex::new(Views::default())),
        }
    }

    /// The table's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the lock, blocking until it is free
    pub fn lock(&self) -> TableGuard {
        TableGuard {
            name: Arc::clone(&self.name),
            views: self.views.lock_arc(),
        }
    }

    /// Acquire the lock only if it is free right now
    ///
    /// Never blocks. Returns `None` if another holder has it.
    pub fn try_lock(&self) -> Option<TableGuard> {
        self.views.try_lock_arc().map(|views| TableGuard {
            name: Arc::clone(&self.name),
            views,
        })
    }

    /// Whether some caller currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.views.is_locked()
    }
}

/// Exclusive access to a table
///
/// Dropping the guard releases the lock. Pending tentative writes are left
/// in place; callers that need them discarded must `rollback_changes` first.
pub struct TableGuard {
    name: Arc<str>,
    views: ArcMutexGuard<RawMutex, Views>,
}

impl TableGuard {
    /// Name of the locked table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a key, tentative view first, then committed
    pub fn get(&self, key: &str) -> Result<String> {
        self.views
            .tentative
            .get(key)
            .or_else(|| self.views.committed.get(key))
            .cloned()
            .ok_or_else(|| TxkvError::KeyNotFound {
                table: self.name.to_string(),
                key: key.to_string(),
            })
    }

    /// Whether a key is present in either view
    pub fn has_key(&self, key: &str) -> bool {
        self.views.tentative.contains_key(key) || self.views.committed.contains_key(key)
    }

    /// Write a value into the tentative view
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.views.tentative.insert(key.into(), value.into());
    }

    /// Replace the committed view with the tentative one
    pub fn commit_changes(&mut self) {
        let snapshot = self.views.tentative.clone();
        self.views.committed = snapshot;
    }

    /// Replace the tentative view with the committed one
    pub fn rollback_changes(&mut self) {
        let snapshot = self.views.committed.clone();
        self.views.tentative = snapshot;
    }

    /// Whether the tentative view differs from the committed one
    pub fn has_pending_changes(&self) -> bool {
        self.views.tentative != self.views.committed
    }

    /// Release the lock
    pub fn unlock(self) {
        drop(self);
    }
}

impl fmt::Debug for TableGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableGuard").field("name", &self.name).finish()
    }
}
