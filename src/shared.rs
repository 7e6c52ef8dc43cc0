use crate::entry::{CacheEntry, EntryCallback};
use crate::error::CacheError;
use crate::loader::{LoaderFn, SingleFlight};
use crate::task::janitor::Janitor;
use crate::LOG_TARGET;

use log::debug;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) type StateGuard<'a, K, V> = RwLockWriteGuard<'a, TableState<K, V>>;

/// Everything guarded by the table lock: the items themselves, the loader,
/// the observer registries and the configuration flags.
pub(crate) struct TableState<K, V> {
  pub(crate) items: HashMap<K, Arc<CacheEntry<K, V>>, ahash::RandomState>,
  /// Janitor tick period. Zero disables timed sweeps.
  pub(crate) cleanup_interval: Duration,
  pub(crate) loader: Option<LoaderFn<K, V>>,
  /// When set, a loader error admits a cached null entry instead of
  /// surfacing the error.
  pub(crate) enable_null_data: bool,
  pub(crate) added_callbacks: Vec<EntryCallback<K, V>>,
  pub(crate) about_to_delete_callbacks: Vec<EntryCallback<K, V>>,
  pub(crate) janitor: Option<Janitor>,
}

/// The internal, thread-safe core of a cache table.
pub(crate) struct TableShared<K: Send, V: Send + Sync> {
  pub(crate) name: String,
  pub(crate) state: RwLock<TableState<K, V>>,
  /// Per-key dedup gate for loader flights. Internally synchronised and
  /// never touched while the table lock is held.
  pub(crate) flights: SingleFlight<K, Result<Arc<CacheEntry<K, V>>, CacheError>>,
}

impl<K: Send, V: Send + Sync> fmt::Debug for TableShared<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TableShared")
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}

impl<K: Send, V: Send + Sync> Drop for TableShared<K, V> {
  fn drop(&mut self) {
    if let Some(janitor) = self.state.get_mut().janitor.take() {
      janitor.stop();
    }
  }
}

impl<K, V> TableShared<K, V>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new(name: String, cleanup_interval: Duration) -> Self {
    Self {
      name,
      state: RwLock::new(TableState {
        items: HashMap::default(),
        cleanup_interval,
        loader: None,
        enable_null_data: false,
        added_callbacks: Vec::new(),
        about_to_delete_callbacks: Vec::new(),
        janitor: None,
      }),
      flights: SingleFlight::new(),
    }
  }

  /// Inserts `entry` under the held lock and returns the added-item
  /// callbacks for the caller to fire once the lock has been released.
  /// Callbacks are never invoked while the table lock is held.
  fn admit_locked(
    &self,
    guard: &mut StateGuard<'_, K, V>,
    entry: &Arc<CacheEntry<K, V>>,
  ) -> Vec<EntryCallback<K, V>> {
    debug!(
      target: LOG_TARGET,
      "table {}: adding key {:?} with life span {:?}",
      self.name,
      entry.key(),
      entry.life_span()
    );
    guard.items.insert(entry.key().clone(), entry.clone());
    guard.added_callbacks.clone()
  }

  /// Inserts `entry` (replacing any previous entry for its key) and fires
  /// the added-item callbacks in registration order.
  pub(crate) fn add_entry(&self, entry: &Arc<CacheEntry<K, V>>) {
    let mut guard = self.state.write();
    let added = self.admit_locked(&mut guard, entry);
    drop(guard);

    for callback in &added {
      callback(entry);
    }
  }

  /// Inserts `entry` only if its key is absent. The check-and-insert is one
  /// critical section, so concurrent calls for a key produce exactly one
  /// winner.
  pub(crate) fn add_entry_if_absent(&self, entry: &Arc<CacheEntry<K, V>>) -> bool {
    let mut guard = self.state.write();
    if guard.items.contains_key(entry.key()) {
      return false;
    }
    let added = self.admit_locked(&mut guard, entry);
    drop(guard);

    for callback in &added {
      callback(entry);
    }
    true
  }

  /// Removes `key`, firing the about-to-delete and per-entry
  /// about-to-expire callbacks first.
  ///
  /// The callbacks observe the entry while it is still present in the
  /// table; the map removal happens only after the fan-out, under a
  /// re-acquired write lock. Concurrent readers may still hit the entry in
  /// that window.
  pub(crate) fn delete_locked<'a>(
    &'a self,
    guard: StateGuard<'a, K, V>,
    key: &K,
  ) -> (StateGuard<'a, K, V>, Result<Arc<CacheEntry<K, V>>, CacheError>) {
    let entry = match guard.items.get(key) {
      Some(entry) => entry.clone(),
      None => return (guard, Err(CacheError::KeyNotFound)),
    };
    let about_to_delete = guard.about_to_delete_callbacks.clone();
    drop(guard);

    for callback in &about_to_delete {
      callback(&entry);
    }
    for callback in entry.expire_callbacks() {
      callback(entry.key());
    }

    let mut guard = self.state.write();
    debug!(
      target: LOG_TARGET,
      "table {}: deleting key {:?} hit {} times, age {:?}",
      self.name,
      key,
      entry.access_count(),
      entry.created_on().elapsed()
    );
    guard.items.remove(key);
    (guard, Ok(entry))
  }

  /// One expiration pass over the whole table.
  ///
  /// Expiry is decided on creation time; keep-alive traffic does not move
  /// the deadline. An expired entry that was accessed within the last third
  /// of its life span is refreshed through the loader (when one is
  /// configured) instead of being dropped. The key set is snapshotted at
  /// pass entry because admission and deletion both release the lock around
  /// their callback fan-out.
  pub(crate) fn expiration_check(&self) {
    let mut guard = self.state.write();
    if guard.cleanup_interval > Duration::ZERO {
      debug!(
        target: LOG_TARGET,
        "table {}: expiration check triggered after {:?}", self.name, guard.cleanup_interval
      );
    } else {
      debug!(target: LOG_TARGET, "table {}: expiration check triggered", self.name);
    }

    let now = Instant::now();
    let keys: Vec<K> = guard.items.keys().cloned().collect();

    for key in keys {
      // The entry may have been replaced or removed while the lock was
      // released for a previous iteration's callbacks.
      let entry = match guard.items.get(&key) {
        Some(entry) => entry.clone(),
        None => continue,
      };
      let (life_span, created_on, accessed_on) = entry.expiry_snapshot();
      if life_span == Duration::ZERO {
        continue;
      }
      if now.duration_since(created_on) < life_span {
        continue;
      }

      if let Some(loader) = guard.loader.clone() {
        if now.duration_since(accessed_on) <= life_span * 2 / 3 {
          // Recently accessed: refresh in place. The loader runs under the
          // table lock, so janitor-path loaders are expected to be fast.
          if let Ok((value, life_span)) = loader(&key) {
            let fresh = Arc::new(CacheEntry::new(key.clone(), life_span, Some(value)));
            let added = self.admit_locked(&mut guard, &fresh);
            drop(guard);
            for callback in &added {
              callback(&fresh);
            }
            guard = self.state.write();
            continue;
          }
        }
      }

      let (reacquired, _) = self.delete_locked(guard, &key);
      guard = reacquired;
    }
  }
}
