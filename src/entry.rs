use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A callback invoked with the key of an entry that is about to leave the
/// cache.
pub type KeyCallback<K> = Arc<dyn Fn(&K) + Send + Sync>;

/// A callback invoked with a table entry, on admission or ahead of removal.
pub type EntryCallback<K, V> = Arc<dyn Fn(&Arc<CacheEntry<K, V>>) + Send + Sync>;

/// The mutable portion of an entry, guarded by the entry's own lock so that
/// keep-alive traffic never touches the table lock.
struct EntryState<K> {
  accessed_on: Instant,
  access_count: u64,
  about_to_expire: Vec<KeyCallback<K>>,
}

/// A single cached record: key, value and lifecycle metadata.
///
/// Entries are handed out as `Arc<CacheEntry>` and stay readable even after
/// they have been removed from their table. The value is `None` only for
/// entries admitted by the loader-error path of a table with null data
/// enabled.
pub struct CacheEntry<K, V> {
  key: K,
  value: Option<Arc<V>>,
  /// How long this entry lives. Zero means it never expires by time.
  life_span: Duration,
  created_on: Instant,
  state: RwLock<EntryState<K>>,
}

impl<K, V> CacheEntry<K, V> {
  /// Creates a new entry. `created_on` and `accessed_on` start at now and
  /// the access counter at zero.
  pub(crate) fn new(key: K, life_span: Duration, value: Option<V>) -> Self {
    let now = Instant::now();
    Self {
      key,
      value: value.map(Arc::new),
      life_span,
      created_on: now,
      state: RwLock::new(EntryState {
        accessed_on: now,
        access_count: 0,
        about_to_expire: Vec::new(),
      }),
    }
  }

  /// Returns the entry's key.
  #[inline]
  pub fn key(&self) -> &K {
    &self.key
  }

  /// Returns a clone of the `Arc` holding the value, or `None` for a cached
  /// null entry.
  #[inline]
  pub fn value(&self) -> Option<Arc<V>> {
    self.value.clone()
  }

  /// Returns the entry's life span. Zero means the entry never expires.
  #[inline]
  pub fn life_span(&self) -> Duration {
    self.life_span
  }

  /// Returns when the entry was admitted to its table.
  #[inline]
  pub fn created_on(&self) -> Instant {
    self.created_on
  }

  /// Returns when the entry was last read through the keep-alive path.
  pub fn accessed_on(&self) -> Instant {
    self.state.read().accessed_on
  }

  /// Returns how many times the entry has been read through the keep-alive
  /// path.
  pub fn access_count(&self) -> u64 {
    self.state.read().access_count
  }

  /// Marks the entry as accessed: refreshes the access timestamp and bumps
  /// the counter. Runs under the entry's own lock only.
  pub fn keep_alive(&self) {
    let mut state = self.state.write();
    state.accessed_on = Instant::now();
    state.access_count += 1;
  }

  /// Replaces any registered about-to-expire callbacks with `f`.
  pub fn set_about_to_expire_callback(&self, f: impl Fn(&K) + Send + Sync + 'static) {
    let mut state = self.state.write();
    state.about_to_expire.clear();
    state.about_to_expire.push(Arc::new(f));
  }

  /// Appends `f` to the about-to-expire callback queue.
  pub fn add_about_to_expire_callback(&self, f: impl Fn(&K) + Send + Sync + 'static) {
    self.state.write().about_to_expire.push(Arc::new(f));
  }

  /// Empties the about-to-expire callback queue.
  pub fn remove_about_to_expire_callbacks(&self) {
    self.state.write().about_to_expire.clear();
  }

  /// Snapshots the about-to-expire callbacks so they can be fired without
  /// holding the entry lock.
  pub(crate) fn expire_callbacks(&self) -> Vec<KeyCallback<K>> {
    self.state.read().about_to_expire.clone()
  }

  /// Snapshots the sweep-relevant timestamps in one lock acquisition.
  pub(crate) fn expiry_snapshot(&self) -> (Duration, Instant, Instant) {
    let state = self.state.read();
    (self.life_span, self.created_on, state.accessed_on)
  }
}

impl<K: fmt::Debug, V> fmt::Debug for CacheEntry<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("key", &self.key)
      .field("life_span", &self.life_span)
      .field("created_on", &self.created_on)
      .field("has_value", &self.value.is_some())
      .finish_non_exhaustive()
  }
}
