//! Registry Tests

use std::sync::Arc;
use std::thread;

use txkv::store::Registry;

#[test]
fn test_new_registry_is_empty() {
    let registry = Registry::new();
    assert_eq!(registry.table_count(), 0);
    assert!(registry.find_table("t").is_none());
}

#[test]
fn test_create_and_find() {
    let registry = Registry::new();

    assert!(registry.create_table("accounts"));

    let table = registry.find_table("accounts").unwrap();
    assert_eq!(table.name(), "accounts");
    assert!(registry.find_table("other").is_none());
}

#[test]
fn test_create_is_idempotent() {
    let registry = Registry::new();

    assert!(registry.create_table("t"));
    registry.find_table("t").unwrap().lock().set("k", "v");

    assert!(!registry.create_table("t"));
    assert_eq!(registry.table_count(), 1);

    // The existing table, data included, is left alone
    let table = registry.find_table("t").unwrap();
    assert_eq!(table.lock().get("k").unwrap(), "v");
}

#[test]
fn test_find_returns_same_table() {
    let registry = Registry::new();
    registry.create_table("t");

    let a = registry.find_table("t").unwrap();
    let b = registry.find_table("t").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let _guard = a.lock();
    assert!(b.try_lock().is_none());
}

#[test]
fn test_table_names_sorted() {
    let registry = Registry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.create_table(name);
    }
    assert_eq!(registry.table_names(), vec!["alpha", "mid", "zeta"]);
}

#[test]
fn test_concurrent_create_same_name() {
    let registry = Arc::new(Registry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = Arc::clone(&registry);
            thread::spawn(move || r.create_table("shared"))
        })
        .collect();

    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&created| created)
        .count();

    assert_eq!(created, 1);
    assert_eq!(registry.table_count(), 1);
}
