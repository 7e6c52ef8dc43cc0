use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::loader::LoadError;
use crate::shared::TableShared;
use crate::task::janitor::Janitor;
use crate::LOG_TARGET;

use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// A named, concurrency-safe key/value cache with per-entry expiration.
///
/// A table is an independently synchronised unit: a single read/write lock
/// guards its items, loader and observer registries, while each entry keeps
/// its access metadata under its own lock. Handles are cheap to clone and
/// share one underlying table.
///
/// Lifecycle callbacks are always invoked *after* the table lock has been
/// released, so a callback may safely re-enter the table with read
/// operations.
pub struct CacheTable<K: Send, V: Send + Sync> {
  shared: Arc<TableShared<K, V>>,
}

impl<K: Send, V: Send + Sync> Clone for CacheTable<K, V> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<K: Send, V: Send + Sync> fmt::Debug for CacheTable<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheTable")
      .field("name", &self.shared.name)
      .finish_non_exhaustive()
  }
}

impl<K, V> CacheTable<K, V>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Creates a table without timed sweeps. Entries with a life span still
  /// expire once [`expiration_check`](Self::expiration_check) runs.
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_cleanup_interval(name, Duration::ZERO)
  }

  /// Creates a table and, when `cleanup_interval` is non-zero, starts a
  /// janitor that runs an expiration pass on that interval.
  pub fn with_cleanup_interval(name: impl Into<String>, cleanup_interval: Duration) -> Self {
    let shared = Arc::new(TableShared::new(name.into(), cleanup_interval));
    if cleanup_interval > Duration::ZERO {
      let janitor = Janitor::spawn(Arc::downgrade(&shared), cleanup_interval);
      shared.state.write().janitor = Some(janitor);
    }
    Self { shared }
  }

  /// Returns the table's name.
  pub fn name(&self) -> &str {
    &self.shared.name
  }

  /// Returns how many entries the table currently holds.
  pub fn count(&self) -> usize {
    self.shared.state.read().items.len()
  }

  /// Returns whether `key` is present. Unlike [`get`](Self::get) this
  /// neither invokes the loader nor refreshes the entry's access time.
  pub fn exists(&self, key: &K) -> bool {
    self.shared.state.read().items.contains_key(key)
  }

  /// Adds a key/value pair, replacing any previous entry for the key.
  ///
  /// `life_span` of zero means the entry never expires by time. The
  /// added-item callbacks fire after the entry is in place, in registration
  /// order. Returns the admitted entry.
  pub fn set(&self, key: K, life_span: Duration, value: V) -> Arc<CacheEntry<K, V>> {
    let entry = Arc::new(CacheEntry::new(key, life_span, Some(value)));
    self.shared.add_entry(&entry);
    entry
  }

  /// Adds a key/value pair only if `key` is not yet cached. Returns whether
  /// the admission happened. The check-and-insert is atomic: of any number
  /// of concurrent `add` calls for one key, exactly one wins.
  pub fn add(&self, key: K, life_span: Duration, value: V) -> bool {
    let entry = Arc::new(CacheEntry::new(key, life_span, Some(value)));
    self.shared.add_entry_if_absent(&entry)
  }

  /// Returns the entry for `key` and marks it as accessed.
  ///
  /// On a miss with a configured loader, the call becomes a read-through:
  /// concurrent misses for the same key share a single loader invocation
  /// and all receive the same result. A loader error is passed through,
  /// unless null data is enabled, in which case a null entry is admitted
  /// and returned instead.
  pub fn get(&self, key: &K) -> Result<Arc<CacheEntry<K, V>>, CacheError> {
    let state = self.shared.state.read();
    let hit = state.items.get(key).cloned();
    let loader = state.loader.clone();
    let cache_null = state.enable_null_data;
    drop(state);

    if let Some(entry) = hit {
      entry.keep_alive();
      return Ok(entry);
    }

    let loader = match loader {
      Some(loader) => loader,
      None => return Err(CacheError::KeyNotFound),
    };

    self.shared.flights.work(key, || match loader(key) {
      Ok((value, life_span)) => {
        let entry = Arc::new(CacheEntry::new(key.clone(), life_span, Some(value)));
        self.shared.add_entry(&entry);
        Ok(entry)
      }
      Err(_) if cache_null => {
        let entry = Arc::new(CacheEntry::new(key.clone(), Duration::ZERO, None));
        self.shared.add_entry(&entry);
        Ok(entry)
      }
      Err(err) => Err(CacheError::Loader(Arc::from(err))),
    })
  }

  /// Deletes `key` from the table, returning the removed entry.
  ///
  /// The about-to-delete callbacks (then the entry's own about-to-expire
  /// callbacks) fire while the entry is still present; the removal is
  /// finalized afterwards.
  pub fn delete(&self, key: &K) -> Result<Arc<CacheEntry<K, V>>, CacheError> {
    let guard = self.shared.state.write();
    let (guard, removed) = self.shared.delete_locked(guard, key);
    drop(guard);
    removed
  }

  /// Deletes every entry. No delete callbacks fire. Also zeroes the cleanup
  /// interval, so no further timed sweeps are scheduled; an already running
  /// janitor keeps ticking over the empty table until it is stopped.
  pub fn flush(&self) {
    let mut guard = self.shared.state.write();
    debug!(target: LOG_TARGET, "table {}: flushing", self.shared.name);
    guard.items = HashMap::default();
    guard.cleanup_interval = Duration::ZERO;
  }

  /// Calls `visitor` for every entry. Iteration order is unspecified.
  ///
  /// The visitor runs under the table's read lock and must not re-enter the
  /// table with a mutating operation.
  pub fn foreach(&self, mut visitor: impl FnMut(&K, &Arc<CacheEntry<K, V>>)) {
    let state = self.shared.state.read();
    for (key, entry) in &state.items {
      visitor(key, entry);
    }
  }

  /// Returns up to `count` entries, most accessed first. Access counters
  /// are not modified.
  pub fn most_accessed(&self, count: usize) -> Vec<Arc<CacheEntry<K, V>>> {
    let state = self.shared.state.read();
    let mut pairs: Vec<(K, u64)> = state
      .items
      .iter()
      .map(|(key, entry)| (key.clone(), entry.access_count()))
      .collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1));

    pairs
      .into_iter()
      .take(count)
      .filter_map(|(key, _)| state.items.get(&key).cloned())
      .collect()
  }

  /// Runs one expiration pass right now, independent of the janitor.
  pub fn expiration_check(&self) {
    self.shared.expiration_check();
  }

  /// Configures the data loader invoked on cache misses.
  pub fn set_data_loader(
    &self,
    loader: impl Fn(&K) -> Result<(V, Duration), LoadError> + Send + Sync + 'static,
  ) {
    self.shared.state.write().loader = Some(Arc::new(loader));
  }

  /// Controls whether a loader error admits a cached null entry (visible to
  /// [`exists`](Self::exists), value `None`) instead of surfacing the
  /// error.
  pub fn enable_null_data(&self, enabled: bool) {
    self.shared.state.write().enable_null_data = enabled;
  }

  /// Replaces any registered added-item callbacks with `f`.
  pub fn set_added_item_callback(
    &self,
    f: impl Fn(&Arc<CacheEntry<K, V>>) + Send + Sync + 'static,
  ) {
    let mut guard = self.shared.state.write();
    guard.added_callbacks.clear();
    guard.added_callbacks.push(Arc::new(f));
  }

  /// Appends `f` to the added-item callback queue.
  pub fn add_added_item_callback(
    &self,
    f: impl Fn(&Arc<CacheEntry<K, V>>) + Send + Sync + 'static,
  ) {
    self.shared.state.write().added_callbacks.push(Arc::new(f));
  }

  /// Empties the added-item callback queue.
  pub fn remove_added_item_callbacks(&self) {
    self.shared.state.write().added_callbacks.clear();
  }

  /// Replaces any registered about-to-delete callbacks with `f`.
  pub fn set_about_to_delete_item_callback(
    &self,
    f: impl Fn(&Arc<CacheEntry<K, V>>) + Send + Sync + 'static,
  ) {
    let mut guard = self.shared.state.write();
    guard.about_to_delete_callbacks.clear();
    guard.about_to_delete_callbacks.push(Arc::new(f));
  }

  /// Appends `f` to the about-to-delete callback queue.
  pub fn add_about_to_delete_item_callback(
    &self,
    f: impl Fn(&Arc<CacheEntry<K, V>>) + Send + Sync + 'static,
  ) {
    self
      .shared
      .state
      .write()
      .about_to_delete_callbacks
      .push(Arc::new(f));
  }

  /// Empties the about-to-delete callback queue.
  pub fn remove_about_to_delete_item_callbacks(&self) {
    self.shared.state.write().about_to_delete_callbacks.clear();
  }
}
