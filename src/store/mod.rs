//! Store Module
//!
//! In-memory tables and the registry that owns them.
//!
//! ## Responsibilities
//! - Keep a committed and a tentative view per table
//! - Expose a per-table lock with blocking and non-blocking acquisition
//! - Create tables on demand and look them up by name
//!
//! ## Locking
//! The table type never locks on its own behalf. Callers acquire a
//! [`TableGuard`] and perform reads, writes, commit and rollback through it,
//! so a transaction can keep a table locked across several commands.

mod table;
mod registry;

pub use table::{Table, TableGuard};
pub use registry::Registry;
