//! The caller-facing map handle.

use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::engine::{CLOSED, Engine, LiveEngine};
use crate::slot::Deadline;
use crate::sync::{Arc, AtomicBool, Ordering, RwLock};
use crate::{HandoffError, MapConfig};

/// A map of independent single-value hand-off points, one per key.
///
/// Producers publish with [`put`](Self::put); consumers block in
/// [`take`](Self::take) until the value for their key arrives. A key holds
/// at most one pending value: later puts for the same key are ignored until
/// the value is taken.
///
/// When several consumers wait on the same key, all of them wake when the
/// value arrives, but only the first to remove the entry receives it. The
/// rest get `Ok(None)`. There is no FIFO ordering among waiters.
///
/// [`clear`](Self::clear) shuts the map down for good. Consumers blocked at
/// that moment get [`HandoffError::Cancelled`]; every later call gets
/// [`HandoffError::NotActive`].
///
/// Share it between threads with `Arc<HandoffMap<K, V>>`.
pub struct HandoffMap<K, V> {
    engine: RwLock<Engine<K, V>>,
    /// Mirrors the engine tag. Only written under the engine write lock.
    closed: AtomicBool,
}

impl<K, V> std::fmt::Debug for HandoffMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.closed.load(Ordering::Acquire) {
            "closed"
        } else {
            "live"
        };
        f.debug_struct("HandoffMap").field("state", &state).finish()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for HandoffMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> HandoffMap<K, V> {
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        Self {
            engine: RwLock::new(Engine::Live(Arc::new(LiveEngine::new(&config)))),
            closed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the engine serving calls right now. The lock is released
    /// before the caller uses it, so a blocking `take` never holds it.
    fn current(&self) -> Engine<K, V> {
        self.engine.read().clone()
    }

    /// Publish `value` under `key`. Never blocks.
    ///
    /// Returns `Ok(None)` if the value was accepted, or `Ok(Some(pending))`
    /// if a value was already waiting to be taken for `key`, in which case
    /// `value` is discarded.
    pub fn put(&self, key: K, value: V) -> Result<Option<V>, HandoffError> {
        self.current().put(key, value)
    }

    /// Same as [`put`](Self::put). The map is unbounded, so an offer never
    /// waits for room.
    pub fn offer(&self, key: K, value: V) -> Result<Option<V>, HandoffError> {
        self.current().offer(key, value)
    }

    /// Same as [`offer`](Self::offer); the timeout is never needed.
    pub fn offer_timeout(
        &self,
        key: K,
        value: V,
        _timeout: Duration,
    ) -> Result<Option<V>, HandoffError> {
        self.current().offer(key, value)
    }

    /// Wait for the value under `key` and consume it.
    ///
    /// Returns `Ok(None)` if another consumer of the same key got the value
    /// first, or if the map started shutting down before this call began
    /// waiting. Returns `Err(Cancelled)` if a shutdown released this call
    /// while it was waiting.
    pub fn take(&self, key: &K) -> Result<Option<V>, HandoffError> {
        self.current().take(key, Deadline::Never)
    }

    /// Like [`take`](Self::take), but gives up with `Ok(None)` once `timeout`
    /// has elapsed. A zero timeout only succeeds if the value is already
    /// there.
    pub fn take_timeout(&self, key: &K, timeout: Duration) -> Result<Option<V>, HandoffError> {
        self.current().take(key, Deadline::after(timeout))
    }

    /// Consume the value under `key` only if it is already available.
    pub fn remove(&self, key: &K) -> Result<Option<V>, HandoffError> {
        self.current().remove(key)
    }

    /// Copy of the value under `key`, without waiting and without consuming it.
    pub fn get(&self, key: &K) -> Result<Option<V>, HandoffError> {
        self.current().get(key)
    }

    /// Whether a value is waiting to be taken under `key`. A key that only has
    /// consumers waiting on it is not available.
    pub fn is_key_available(&self, key: &K) -> Result<bool, HandoffError> {
        self.current().is_key_available(key)
    }

    /// Alias of [`is_key_available`](Self::is_key_available).
    pub fn contains_key(&self, key: &K) -> Result<bool, HandoffError> {
        self.current().is_key_available(key)
    }

    /// Number of keys with a value waiting to be taken.
    pub fn len(&self) -> Result<usize, HandoffError> {
        self.current().len()
    }

    pub fn is_empty(&self) -> Result<bool, HandoffError> {
        self.current().is_empty()
    }

    /// Shut the map down.
    ///
    /// The first call switches the map to its closed state, then interrupts
    /// every blocked [`take`](Self::take) and drops all entries. Any later
    /// call returns `Err(NotActive)`.
    pub fn clear(&self) -> Result<(), HandoffError> {
        // Swap first: callers that already hold the live engine are released
        // by its clear, everyone after the swap is refused.
        let previous = {
            let mut engine = self.engine.write();
            if !engine.is_live() {
                None
            } else {
                self.closed.store(true, Ordering::Release);
                Some(std::mem::replace(&mut *engine, Engine::Closed(&CLOSED)))
            }
        };
        match previous {
            Some(previous) => {
                debug!("switched to closed engine");
                previous.clear()
            }
            None => CLOSED.reject("clear"),
        }
    }

    /// Not supported: entries are hand-off points, not stored data.
    pub fn put_all<I>(&self, _entries: I) -> Result<(), HandoffError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.current().unsupported("put_all")
    }

    /// Not supported.
    pub fn keys(&self) -> Result<Vec<K>, HandoffError> {
        self.current().unsupported("keys")
    }

    /// Not supported.
    pub fn values(&self) -> Result<Vec<V>, HandoffError> {
        self.current().unsupported("values")
    }

    /// Not supported.
    pub fn entries(&self) -> Result<Vec<(K, V)>, HandoffError> {
        self.current().unsupported("entries")
    }

    /// Whether [`clear`](Self::clear) has switched this map off.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<K: Eq + Hash + Clone, V: Clone + PartialEq> HandoffMap<K, V> {
    /// Whether any key currently holds `value`.
    pub fn contains_value(&self, value: &V) -> Result<bool, HandoffError> {
        self.current().contains_value(value)
    }
}
