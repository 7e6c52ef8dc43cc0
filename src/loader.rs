use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Duration;

/// The error type a data loader may return. It is passed through to the
/// caller unchanged (unless the table caches null data).
pub type LoadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A caller-supplied function that synthesizes a value and its life span for
/// a missing key.
pub type LoaderFn<K, V> = Arc<dyn Fn(&K) -> Result<(V, Duration), LoadError> + Send + Sync>;

enum FlightState<T> {
  Pending,
  Complete(T),
}

struct FlightInner<T> {
  state: FlightState<T>,
  waiters: VecDeque<Thread>,
}

/// One in-flight computation. The leader publishes the result and unparks
/// every waiter; waiters park until the state turns `Complete`.
struct Flight<T> {
  inner: Mutex<FlightInner<T>>,
}

impl<T: Clone> Flight<T> {
  fn new() -> Self {
    Self {
      inner: Mutex::new(FlightInner {
        state: FlightState::Pending,
        waiters: VecDeque::new(),
      }),
    }
  }

  fn complete(&self, result: T) {
    let mut inner = self.inner.lock();
    inner.state = FlightState::Complete(result);
    for waiter in inner.waiters.drain(..) {
      waiter.unpark();
    }
  }

  fn wait(&self) -> T {
    // Parking can wake spuriously, so re-check the state on every pass.
    loop {
      {
        let mut inner = self.inner.lock();
        match &inner.state {
          FlightState::Complete(result) => return result.clone(),
          FlightState::Pending => inner.waiters.push_back(thread::current()),
        }
      }
      thread::park();
    }
  }
}

/// Per-key deduplication of concurrent computations.
///
/// The first caller for a key becomes the flight's leader and runs the
/// closure; everyone arriving while the flight is open waits and receives
/// the leader's exact result. Once the flight completes, the record is gone
/// and the next caller starts a fresh one.
pub(crate) struct SingleFlight<K, T> {
  calls: Mutex<HashMap<K, Arc<Flight<T>>, ahash::RandomState>>,
}

impl<K, T> SingleFlight<K, T>
where
  K: Eq + Hash + Clone,
  T: Clone,
{
  pub(crate) fn new() -> Self {
    Self {
      calls: Mutex::new(HashMap::default()),
    }
  }

  /// Runs `f` exactly once per flight of `key`, returning its result to
  /// every concurrent caller.
  pub(crate) fn work(&self, key: &K, f: impl FnOnce() -> T) -> T {
    let (flight, leader) = {
      let mut calls = self.calls.lock();
      match calls.get(key) {
        Some(flight) => (flight.clone(), false),
        None => {
          let flight = Arc::new(Flight::new());
          calls.insert(key.clone(), flight.clone());
          (flight, true)
        }
      }
    };

    if !leader {
      return flight.wait();
    }

    let result = f();
    // Drop the record before waking the waiters: a caller arriving from
    // here on starts a fresh flight instead of observing this result.
    self.calls.lock().remove(key);
    flight.complete(result.clone());
    result
  }
}
