use cachetable::{registry, CacheTable};
use std::time::Duration;

fn main() {
  let cache: CacheTable<String, String> =
    registry::table_with_cleanup("my_cache", Duration::from_secs(5));

  // The data loader gets called automatically whenever something tries to
  // retrieve a non-existing key from the cache.
  cache.set_data_loader(|key: &String| {
    // Apply some clever loading logic here, e.g. read values for this key
    // from database, network or file.
    let val = format!("This is a test with key {key}");
    Ok((val, Duration::ZERO))
  });

  // Retrieve a few auto-generated items from the cache.
  for i in 0..10 {
    match cache.get(&format!("some_key_{i}")) {
      Ok(entry) => println!("Found value in cache: {}", entry.value().unwrap()),
      Err(err) => println!("Error retrieving value from cache: {err}"),
    }
  }
}
