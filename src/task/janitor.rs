use crate::shared::TableShared;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

/// Shared stop signal between a janitor handle and its worker thread.
struct Shutdown {
  stopped: Mutex<bool>,
  signal: Condvar,
}

/// The background worker that periodically asks its table to run an
/// expiration pass.
///
/// The worker holds only a `Weak` back reference to the table: the table
/// owns the janitor, never the other way around. `stop` consumes the handle,
/// so the stop signal is delivered exactly once; a worker whose table has
/// been torn down exits on its own at the next tick.
pub(crate) struct Janitor {
  shutdown: Arc<Shutdown>,
}

impl Janitor {
  /// Spawns the janitor thread, ticking at `tick_interval`.
  pub(crate) fn spawn<K, V>(table: Weak<TableShared<K, V>>, tick_interval: Duration) -> Self
  where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
  {
    let shutdown = Arc::new(Shutdown {
      stopped: Mutex::new(false),
      signal: Condvar::new(),
    });
    let worker_shutdown = shutdown.clone();

    thread::spawn(move || loop {
      {
        let mut stopped = worker_shutdown.stopped.lock();
        if *stopped {
          return;
        }
        // Timed wait doubles as the tick; a stop request interrupts it.
        let _ = worker_shutdown.signal.wait_for(&mut stopped, tick_interval);
        if *stopped {
          return;
        }
      }

      match table.upgrade() {
        Some(shared) => shared.expiration_check(),
        None => return,
      }
    });

    Self { shutdown }
  }

  /// Signals the worker to stop. Consumes the handle: the signal is sent
  /// exactly once.
  pub(crate) fn stop(self) {
    let mut stopped = self.shutdown.stopped.lock();
    *stopped = true;
    self.shutdown.signal.notify_one();
  }
}

impl fmt::Debug for Janitor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Janitor").finish_non_exhaustive()
  }
}
