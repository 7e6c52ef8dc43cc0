use cachetable::{CacheError, CacheTable};
use std::thread;
use std::time::Duration;

const JANITOR_TICK: Duration = Duration::from_millis(10);

#[test]
fn test_entry_expires_after_life_span() {
  let table: CacheTable<&str, &str> =
    CacheTable::with_cleanup_interval("expire_basic", JANITOR_TICK);
  table.set("k", Duration::from_millis(150), "v");

  thread::sleep(Duration::from_millis(50));
  assert!(table.get(&"k").is_ok(), "entry should still be alive");

  thread::sleep(Duration::from_millis(300));
  assert!(matches!(table.get(&"k"), Err(CacheError::KeyNotFound)));
  assert_eq!(table.count(), 0);
}

#[test]
fn test_zero_life_span_never_expires() {
  let table: CacheTable<&str, &str> =
    CacheTable::with_cleanup_interval("non_expiring", JANITOR_TICK);
  table.set("k", Duration::ZERO, "v");

  thread::sleep(Duration::from_millis(300));

  let mut hits = 0;
  for _ in 0..5 {
    let entry = table.get(&"k").unwrap();
    assert_eq!(*entry.value().unwrap(), "v");
    hits += 1;
  }
  assert_eq!(table.get(&"k").unwrap().access_count(), hits + 1);
}

#[test]
fn test_keep_alive_does_not_move_the_deadline() {
  // Expiry is decided on creation time. Without a loader there is no
  // refresh path, so accessing the entry cannot save it.
  let table: CacheTable<&str, &str> =
    CacheTable::with_cleanup_interval("keep_alive", JANITOR_TICK);
  table.set("k", Duration::from_millis(200), "v");

  thread::sleep(Duration::from_millis(120));
  assert!(table.get(&"k").is_ok());

  thread::sleep(Duration::from_millis(300));
  assert!(!table.exists(&"k"), "access must not extend the creation-based deadline");
}

#[test]
fn test_mixed_life_spans() {
  // A non-expiring entry ahead of an expiring one makes the sweep iterate
  // past entries it must skip.
  let table: CacheTable<&str, &str> = CacheTable::with_cleanup_interval("mixed", JANITOR_TICK);
  table.set("forever", Duration::ZERO, "v");
  table.set("brief", Duration::from_millis(100), "v");

  thread::sleep(Duration::from_millis(300));
  assert!(table.exists(&"forever"));
  assert!(!table.exists(&"brief"));
}

#[test]
fn test_sweep_without_janitor_is_manual() {
  let table: CacheTable<&str, &str> = CacheTable::new("manual_sweep");
  table.set("k", Duration::from_millis(20), "v");

  thread::sleep(Duration::from_millis(60));
  // No janitor: the expired entry is still there until a pass runs.
  assert!(table.exists(&"k"));

  table.expiration_check();
  assert!(!table.exists(&"k"));
}

#[test]
fn test_flush_disables_scheduled_sweeps_harmlessly() {
  let table: CacheTable<&str, &str> = CacheTable::with_cleanup_interval("flush", JANITOR_TICK);
  table.set("k", Duration::from_secs(10), "v");
  table.flush();
  assert_eq!(table.count(), 0);

  // The janitor keeps ticking over the (now interval-less) table; entries
  // without a life span survive it.
  table.set("k2", Duration::ZERO, "v");
  thread::sleep(Duration::from_millis(100));
  assert!(table.exists(&"k2"));
}
