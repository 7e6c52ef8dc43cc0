use cachetable::{registry, CacheTable};
use std::thread;
use std::time::Duration;

fn main() {
  let cache: CacheTable<&str, &str> =
    registry::table_with_cleanup("my_cache", Duration::from_millis(100));

  // These callbacks trigger every time a new item gets added to the cache.
  cache.set_added_item_callback(|entry| {
    println!("Added callback 1: {:?} {:?} {:?}", entry.key(), entry.value(), entry.created_on());
  });
  cache.add_added_item_callback(|entry| {
    println!("Added callback 2: {:?} {:?} {:?}", entry.key(), entry.value(), entry.created_on());
  });
  // This one triggers every time an item is about to be removed.
  cache.set_about_to_delete_item_callback(|entry| {
    println!("Deleting: {:?} {:?} {:?}", entry.key(), entry.value(), entry.created_on());
  });

  // Caching a new item executes the added-item callbacks.
  cache.set("some_key", Duration::ZERO, "This is a test!");

  // Retrieve the item from the cache.
  match cache.get(&"some_key") {
    Ok(entry) => println!("Found value in cache: {:?}", entry.value()),
    Err(err) => println!("Error retrieving value from cache: {err}"),
  }

  // Deleting the item executes the about-to-delete callback.
  cache.delete(&"some_key").unwrap();

  cache.remove_added_item_callbacks();

  // Cache another item that expires in one second.
  let entry = cache.set("another_key", Duration::from_secs(1), "This is another test");

  // This callback triggers when the item is about to expire.
  entry.set_about_to_expire_callback(|key| {
    println!("About to expire: {key}");
  });

  thread::sleep(Duration::from_millis(1500));
}
