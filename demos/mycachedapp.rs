use cachetable::{registry, CacheTable};
use std::thread;
use std::time::Duration;

// Keys and values can be of arbitrary types, e.g. a struct.
#[derive(Debug)]
struct MyStruct {
  text: String,
}

fn main() {
  // Accessing a named table through the registry for the first time
  // creates it, together with a janitor sweeping every 250ms.
  let cache: CacheTable<&str, MyStruct> =
    registry::table_with_cleanup("my_cache", Duration::from_millis(250));

  // Put a new item in the cache. It expires one second after admission.
  let val = MyStruct {
    text: "This is a test!".to_string(),
  };
  cache.set("some_key", Duration::from_secs(1), val);

  // Retrieve the item from the cache.
  match cache.get(&"some_key") {
    Ok(entry) => println!("Found value in cache: {}", entry.value().unwrap().text),
    Err(err) => println!("Error retrieving value from cache: {err}"),
  }

  // Wait for the item to expire in cache.
  thread::sleep(Duration::from_millis(1500));
  if cache.get(&"some_key").is_err() {
    println!("Item is not cached (anymore).");
  }

  // Set another item that never expires.
  cache.set(
    "some_key",
    Duration::ZERO,
    MyStruct {
      text: "Here to stay".to_string(),
    },
  );

  // The table supports a few handy callbacks and loading mechanisms.
  cache.set_about_to_delete_item_callback(|entry| {
    println!(
      "Deleting: {:?} {} {:?}",
      entry.key(),
      entry.value().unwrap().text,
      entry.created_on()
    );
  });

  // Remove the item from the cache.
  cache.delete(&"some_key").unwrap();

  // And wipe the entire cache table.
  cache.flush();
}
