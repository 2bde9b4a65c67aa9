use std::hash::Hash;
use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{debug, trace};

use crate::slot::{Deadline, WaitOutcome};
use crate::sync::{Arc, AtomicBool, Ordering};
use crate::table::Table;
use crate::{HandoffError, MapConfig};

/// The producer/consumer contract on top of a [`Table`].
pub(crate) struct LiveEngine<K, V> {
    table: Arc<Table<K, V>>,
    /// One-shot guard for [`LiveEngine::clear`].
    cleared: AtomicBool,
    label: Option<String>,
}

impl<K: Eq + Hash + Clone, V: Clone> LiveEngine<K, V> {
    pub(crate) fn new(config: &MapConfig) -> Self {
        Self {
            table: Arc::new(Table::with_capacity(config.initial_capacity)),
            cleared: AtomicBool::new(false),
            label: config.label.clone(),
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Publish `value` under `key`. Never blocks.
    ///
    /// `None` means the value was accepted. `Some(previous)` means a value
    /// was already pending for `key`; the new one is dropped.
    pub(crate) fn put(&self, key: K, value: V) -> Option<V> {
        let previous = self.table.set_if_absent(key, value);
        if previous.is_some() {
            debug!(map = self.label(), "value already pending, put ignored");
        }
        previous
    }

    /// Same as [`LiveEngine::put`]: the table is unbounded, so an offer never
    /// has to wait for room.
    pub(crate) fn offer(&self, key: K, value: V) -> Option<V> {
        self.put(key, value)
    }

    /// Wait for `key`'s value and try to consume it.
    ///
    /// Every caller waiting on the same key sees the value once it is
    /// published, but only the one that removes the entry first gets it; the
    /// others return `Ok(None)`, exactly as if they had timed out.
    pub(crate) fn take(&self, key: &K, deadline: Deadline) -> Result<Option<V>, HandoffError> {
        if self.cleared.load(Ordering::Acquire) {
            return Ok(None);
        }
        let Some(registration) = self.table.register_waiter(key) else {
            return Ok(None);
        };

        trace!(map = self.label(), waiter = registration.id(), "waiting");
        let outcome = registration
            .slot()
            .await_value(deadline, registration.interrupt());
        self.table.unregister_waiter(&registration);

        match outcome {
            WaitOutcome::Ready(value) => {
                if self.table.remove(key, registration.slot()) {
                    trace!(map = self.label(), waiter = registration.id(), "taken");
                    Ok(Some(value))
                } else {
                    trace!(
                        map = self.label(),
                        waiter = registration.id(),
                        "lost removal race"
                    );
                    Ok(None)
                }
            }
            WaitOutcome::TimedOut => {
                trace!(map = self.label(), waiter = registration.id(), "timed out");
                self.table.discard_idle(key, registration.slot());
                Ok(None)
            }
            WaitOutcome::Interrupted => {
                trace!(map = self.label(), waiter = registration.id(), "interrupted");
                Err(HandoffError::Cancelled)
            }
        }
    }

    /// Take `key` only if its value is already available.
    pub(crate) fn remove(&self, key: &K) -> Result<Option<V>, HandoffError> {
        self.take(key, Deadline::after(Duration::ZERO))
    }

    /// Peek at `key`'s value without waiting or consuming it.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.table.slot(key).and_then(|slot| slot.peek())
    }

    pub(crate) fn is_key_available(&self, key: &K) -> bool {
        self.table.slot(key).is_some_and(|slot| slot.is_available())
    }

    /// Number of keys holding a value. Pending demands are not counted.
    pub(crate) fn len(&self) -> usize {
        let mut available = 0;
        self.table.for_each_slot(|_, slot| {
            if slot.is_available() {
                available += 1;
            }
            ControlFlow::Continue(())
        });
        available
    }

    pub(crate) fn is_empty(&self) -> bool {
        let mut empty = true;
        self.table.for_each_slot(|_, slot| {
            if slot.is_available() {
                empty = false;
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });
        empty
    }

    /// Shut down: interrupt every blocked `take` and wipe all entries. Later
    /// calls do nothing.
    pub(crate) fn clear(&self) {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return;
        }
        let sweep = self.table.close();
        debug!(
            map = self.label(),
            interrupted = sweep.interrupted,
            entries = sweep.wiped,
            "map cleared"
        );
    }
}

impl<K: Eq + Hash + Clone, V: Clone + PartialEq> LiveEngine<K, V> {
    pub(crate) fn contains_value(&self, value: &V) -> bool {
        let mut found = false;
        self.table.for_each_slot(|_, slot| {
            if slot.peek().as_ref() == Some(value) {
                found = true;
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });
        found
    }
}
