use cachetable::{CacheError, CacheTable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_added_callbacks_fire_in_registration_order() {
  let events = Arc::new(Mutex::new(Vec::new()));

  let table: CacheTable<&str, &str> = CacheTable::new("added_order");
  table.add_added_item_callback({
    let events = events.clone();
    move |entry| events.lock().unwrap().push(format!("first:{}", entry.key()))
  });
  table.add_added_item_callback({
    let events = events.clone();
    move |entry| events.lock().unwrap().push(format!("second:{}", entry.key()))
  });

  table.set("k", Duration::ZERO, "v");
  assert_eq!(*events.lock().unwrap(), vec!["first:k", "second:k"]);
}

#[test]
fn test_set_callback_replaces_the_queue() {
  let events = Arc::new(Mutex::new(Vec::new()));

  let table: CacheTable<&str, &str> = CacheTable::new("set_replaces_queue");
  for label in ["a", "b", "c"] {
    let events = events.clone();
    table.add_added_item_callback(move |_| events.lock().unwrap().push(label));
  }
  table.set_added_item_callback({
    let events = events.clone();
    move |_| events.lock().unwrap().push("only")
  });

  table.set("k", Duration::ZERO, "v");
  assert_eq!(*events.lock().unwrap(), vec!["only"], "set leaves exactly one callback");
}

#[test]
fn test_removed_callbacks_stay_silent() {
  let fired = Arc::new(AtomicBool::new(false));

  let table: CacheTable<&str, &str> = CacheTable::new("removed");
  table.add_added_item_callback({
    let fired = fired.clone();
    move |_| fired.store(true, Ordering::SeqCst)
  });
  table.add_about_to_delete_item_callback({
    let fired = fired.clone();
    move |_| fired.store(true, Ordering::SeqCst)
  });
  table.remove_added_item_callbacks();
  table.remove_about_to_delete_item_callbacks();

  table.set("k", Duration::ZERO, "v");
  table.delete(&"k").unwrap();
  assert!(!fired.load(Ordering::SeqCst));
}

#[test]
fn test_delete_fires_table_and_entry_callbacks() {
  let events = Arc::new(Mutex::new(Vec::new()));

  let table: CacheTable<&str, &str> = CacheTable::new("delete_callbacks");
  table.add_added_item_callback({
    let events = events.clone();
    move |entry| events.lock().unwrap().push(format!("added:{}", entry.key()))
  });
  table.add_added_item_callback({
    let events = events.clone();
    move |_| events.lock().unwrap().push("added2".to_string())
  });
  table.set_about_to_delete_item_callback({
    let events = events.clone();
    move |entry| {
      events
        .lock()
        .unwrap()
        .push(format!("deleting:{}={}", entry.key(), entry.value().unwrap()))
    }
  });

  let entry = table.set("k", Duration::ZERO, "v");
  entry.add_about_to_expire_callback({
    let events = events.clone();
    move |key| events.lock().unwrap().push(format!("expiring:{key}"))
  });

  table.delete(&"k").unwrap();
  assert_eq!(
    *events.lock().unwrap(),
    vec!["added:k", "added2", "deleting:k=v", "expiring:k"]
  );
  assert!(matches!(table.delete(&"k"), Err(CacheError::KeyNotFound)));
}

#[test]
fn test_delete_callback_observes_the_entry_still_present() {
  // The removal is finalized only after the fan-out: a callback re-entering
  // the table with a read still sees the key.
  let table: CacheTable<&str, &str> = CacheTable::new("delete_window");
  let observed = Arc::new(AtomicBool::new(false));

  table.set_about_to_delete_item_callback({
    let table = table.clone();
    let observed = observed.clone();
    move |entry| observed.store(table.exists(entry.key()), Ordering::SeqCst)
  });

  table.set("k", Duration::ZERO, "v");
  table.delete(&"k").unwrap();

  assert!(observed.load(Ordering::SeqCst));
  assert!(!table.exists(&"k"));
}

#[test]
fn test_entry_expire_callbacks_fire_on_sweep() {
  let events = Arc::new(Mutex::new(Vec::new()));

  let table: CacheTable<&str, &str> =
    CacheTable::with_cleanup_interval("expire_callbacks", Duration::from_millis(10));
  let entry = table.set("k", Duration::from_millis(100), "v");
  entry.add_about_to_expire_callback({
    let events = events.clone();
    move |key| events.lock().unwrap().push(format!("one:{key}"))
  });
  entry.add_about_to_expire_callback({
    let events = events.clone();
    move |key| events.lock().unwrap().push(format!("two:{key}"))
  });

  thread::sleep(Duration::from_millis(300));
  assert!(!table.exists(&"k"));
  assert_eq!(*events.lock().unwrap(), vec!["one:k", "two:k"]);
}

#[test]
fn test_entry_set_and_remove_expire_callbacks() {
  let fired = Arc::new(AtomicBool::new(false));

  let table: CacheTable<&str, &str> = CacheTable::new("entry_registry");
  let entry = table.set("k", Duration::ZERO, "v");
  entry.add_about_to_expire_callback({
    let fired = fired.clone();
    move |_| fired.store(true, Ordering::SeqCst)
  });
  entry.set_about_to_expire_callback(|_| {});
  entry.remove_about_to_expire_callbacks();

  table.delete(&"k").unwrap();
  assert!(!fired.load(Ordering::SeqCst), "cleared callbacks must not fire");
}
