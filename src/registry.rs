//! Process-wide directory of named cache tables.
//!
//! The directory is initialized lazily on first lookup and lives until
//! process exit. Each named table is independent; the directory only hands
//! out shared handles. Tables can also be constructed directly with
//! [`CacheTable::new`] without ever touching the directory.
//!
//! Entries are keyed by name *and* the table's key/value types, so the same
//! name instantiated at two different types yields two distinct tables.

use crate::table::CacheTable;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

type TableDirectory = HashMap<(String, TypeId), Box<dyn Any + Send + Sync>>;

static TABLES: Lazy<RwLock<TableDirectory>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the table registered under `name`, creating it without timed
/// sweeps on first lookup. Idempotent: the same name (at the same key/value
/// types) always yields a handle to the same table.
pub fn table<K, V>(name: &str) -> CacheTable<K, V>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  table_with_cleanup(name, Duration::ZERO)
}

/// Returns the table registered under `name`, creating it on first lookup.
/// A newly created table starts a janitor when `cleanup_interval` is
/// non-zero; the janitor stops when the table is torn down. For an already
/// existing table the interval argument has no effect.
pub fn table_with_cleanup<K, V>(name: &str, cleanup_interval: Duration) -> CacheTable<K, V>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  let key = (name.to_string(), TypeId::of::<(K, V)>());

  {
    let directory = TABLES.read();
    if let Some(existing) = directory.get(&key) {
      return downcast(existing.as_ref());
    }
  }

  let mut directory = TABLES.write();
  // Double check: another thread may have created the table between the
  // read probe and this write lock.
  if let Some(existing) = directory.get(&key) {
    return downcast(existing.as_ref());
  }

  let table = CacheTable::with_cleanup_interval(name, cleanup_interval);
  directory.insert(key, Box::new(table.clone()));
  table
}

fn downcast<K, V>(entry: &(dyn Any + Send + Sync)) -> CacheTable<K, V>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  entry
    .downcast_ref::<CacheTable<K, V>>()
    .expect("directory entries are keyed by their table's type")
    .clone()
}
