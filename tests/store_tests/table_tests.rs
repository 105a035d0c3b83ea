//! Table Tests
//!
//! Tests verify:
//! - Tentative-over-committed read precedence
//! - Commit and rollback semantics
//! - Blocking and non-blocking lock modes
//! - Concurrent access through the lock

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use txkv::store::Table;
use txkv::TxkvError;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_table() {
    let table = Table::new("accounts");
    assert_eq!(table.name(), "accounts");
    assert!(!table.is_locked());
}

#[test]
fn test_set_and_get() {
    let table = Table::new("t");
    let mut guard = table.lock();

    guard.set("k", "v");

    assert_eq!(guard.get("k").unwrap(), "v");
    assert!(guard.has_key("k"));
}

#[test]
fn test_get_missing_key() {
    let table = Table::new("t");
    let guard = table.lock();

    match guard.get("missing") {
        Err(TxkvError::KeyNotFound { table, key }) => {
            assert_eq!(table, "t");
            assert_eq!(key, "missing");
        }
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }
    assert!(!guard.has_key("missing"));
}

#[test]
fn test_later_set_wins() {
    let table = Table::new("t");
    let mut guard = table.lock();

    guard.set("k", "v1");
    guard.set("k", "v2");

    assert_eq!(guard.get("k").unwrap(), "v2");
}

// =============================================================================
// Commit / Rollback Tests
// =============================================================================

#[test]
fn test_rollback_without_commit_forgets_key() {
    let table = Table::new("t");
    let mut guard = table.lock();

    guard.set("k", "v1");
    guard.rollback_changes();

    assert!(matches!(guard.get("k"), Err(TxkvError::KeyNotFound { .. })));
    assert!(!guard.has_key("k"));
}

#[test]
fn test_rollback_restores_committed_value() {
    let table = Table::new("t");
    let mut guard = table.lock();

    guard.set("k", "v1");
    guard.commit_changes();
    guard.set("k", "v2");
    guard.set("other", "x");
    assert!(guard.has_pending_changes());

    guard.rollback_changes();

    assert_eq!(guard.get("k").unwrap(), "v1");
    assert!(!guard.has_key("other"));
    assert!(!guard.has_pending_changes());
}

#[test]
fn test_commit_makes_changes_survive_rollback() {
    let table = Table::new("t");
    let mut guard = table.lock();

    guard.set("a", "1");
    guard.set("b", "2");
    guard.commit_changes();
    assert!(!guard.has_pending_changes());

    guard.rollback_changes();

    assert_eq!(guard.get("a").unwrap(), "1");
    assert_eq!(guard.get("b").unwrap(), "2");
}

#[test]
fn test_changes_persist_across_lock_cycles() {
    let table = Table::new("t");

    let mut guard = table.lock();
    guard.set("k", "v");
    guard.unlock();

    let guard = table.lock();
    assert_eq!(guard.get("k").unwrap(), "v");
}

// =============================================================================
// Lock Mode Tests
// =============================================================================

#[test]
fn test_try_lock_fails_while_held() {
    let table = Table::new("t");

    let guard = table.lock();
    assert!(table.is_locked());
    assert!(table.try_lock().is_none());

    guard.unlock();
    assert!(!table.is_locked());
    assert!(table.try_lock().is_some());
}

#[test]
fn test_try_lock_does_not_block_across_threads() {
    let table = Arc::new(Table::new("t"));
    let guard = table.lock();

    let other = Arc::clone(&table);
    let handle = thread::spawn(move || other.try_lock().is_some());

    assert!(!handle.join().unwrap());
    drop(guard);
}

#[test]
fn test_lock_waits_for_release() {
    let table = Arc::new(Table::new("t"));
    let mut guard = table.lock();
    guard.set("k", "before");

    let other = Arc::clone(&table);
    let handle = thread::spawn(move || {
        let guard = other.lock();
        guard.get("k").unwrap()
    });

    thread::sleep(Duration::from_millis(50));
    guard.set("k", "after");
    guard.unlock();

    assert_eq!(handle.join().unwrap(), "after");
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_writes_under_lock() {
    let table = Arc::new(Table::new("t"));

    let mut handles = vec![];
    for i in 0..10 {
        let t = Arc::clone(&table);
        handles.push(thread::spawn(move || {
            for j in 0..10 {
                let mut guard = t.lock();
                guard.set(format!("key{}_{}", i, j), format!("value{}_{}", i, j));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let guard = table.lock();
    for i in 0..10 {
        for j in 0..10 {
            assert_eq!(
                guard.get(&format!("key{}_{}", i, j)).unwrap(),
                format!("value{}_{}", i, j)
            );
        }
    }
}
