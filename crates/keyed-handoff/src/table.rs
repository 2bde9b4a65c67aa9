//! Key to slot registry.
//!
//! The table owns three pieces of shared state behind one reader/writer lock:
//! the entry map, the registry of callers currently blocked on a slot, and
//! the closed flag. Structural changes (creating or removing an entry,
//! registering a waiter, shutting down) take the write lock; availability
//! queries take the read lock. No lock is ever held across a blocking wait.
//!
//! Lock order is table, then slot. A thread blocked on a slot holds no table
//! lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::ControlFlow;

use crate::slot::{Interrupt, Slot};
use crate::sync::{Arc, AtomicU64, Ordering, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identifies one blocked caller for the duration of one wait.
pub(crate) type WaiterId = u64;

/// A caller's claim on a slot, handed out by [`Table::register_waiter`].
pub(crate) struct Registration<V> {
    id: WaiterId,
    slot: Arc<Slot<V>>,
    interrupt: Arc<Interrupt>,
}

impl<V> Registration<V> {
    pub(crate) fn id(&self) -> WaiterId {
        self.id
    }

    pub(crate) fn slot(&self) -> &Slot<V> {
        &self.slot
    }

    pub(crate) fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }
}

struct Waiter<V> {
    slot: Arc<Slot<V>>,
    interrupt: Arc<Interrupt>,
}

struct TableState<K, V> {
    entries: HashMap<K, Arc<Slot<V>>>,
    waiters: HashMap<WaiterId, Waiter<V>>,
    closed: bool,
}

impl<K: Eq + Hash + Clone, V: Clone> TableState<K, V> {
    fn lookup_or_create(&mut self, key: &K) -> Arc<Slot<V>> {
        if let Some(slot) = self.entries.get(key) {
            return slot.clone();
        }
        let slot = Arc::new(Slot::new());
        self.entries.insert(key.clone(), slot.clone());
        slot
    }

    /// Whether `key` still maps to exactly `slot`.
    fn maps_to(&self, key: &K, slot: &Slot<V>) -> bool {
        self.entries
            .get(key)
            .is_some_and(|current| std::ptr::eq(&**current, slot))
    }
}

/// What a shutdown swept away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sweep {
    pub interrupted: usize,
    pub wiped: usize,
}

pub(crate) struct Table<K, V> {
    state: RwLock<TableState<K, V>>,
    next_waiter: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> Table<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(TableState {
                entries: HashMap::with_capacity(capacity),
                waiters: HashMap::new(),
                closed: false,
            }),
            next_waiter: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TableState<K, V>> {
        self.state.read()
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState<K, V>> {
        self.state.write()
    }

    /// Fill the slot for `key` (creating it if needed) unless it already
    /// holds a value. Same contract as [`Slot::try_set`].
    ///
    /// Lookup and assignment share one critical section, so the slot cannot
    /// be removed between the two.
    pub(crate) fn set_if_absent(&self, key: K, value: V) -> Option<V> {
        let mut state = self.write();
        state
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Slot::new()))
            .try_set(value)
    }

    /// Register the calling thread as a waiter on `key`'s slot.
    ///
    /// Returns `None` once the table is closed. The closed check, slot lookup
    /// and registration happen atomically with respect to [`Table::close`]:
    /// a caller either registers before the shutdown and is swept by it, or
    /// sees the closed flag and never waits.
    pub(crate) fn register_waiter(&self, key: &K) -> Option<Registration<V>> {
        let mut state = self.write();
        if state.closed {
            return None;
        }
        let slot = state.lookup_or_create(key);
        let interrupt = Arc::new(Interrupt::new());
        let id = self.next_waiter.fetch_add(1, Ordering::Relaxed);
        state.waiters.insert(
            id,
            Waiter {
                slot: slot.clone(),
                interrupt: interrupt.clone(),
            },
        );
        Some(Registration {
            id,
            slot,
            interrupt,
        })
    }

    pub(crate) fn unregister_waiter(&self, registration: &Registration<V>) {
        self.write().waiters.remove(&registration.id);
    }

    /// The delivery gate: remove `key` if it still maps to `slot`.
    ///
    /// Among callers that observed the same value, only the one for which
    /// this returns `true` has consumed it.
    pub(crate) fn remove(&self, key: &K, slot: &Slot<V>) -> bool {
        let mut state = self.write();
        if !state.maps_to(key, slot) {
            return false;
        }
        state.entries.remove(key);
        true
    }

    /// Drop `key`'s entry if it is still `slot`, still empty, and nobody is
    /// waiting on it any more. Used after a wait that ended without a value.
    pub(crate) fn discard_idle(&self, key: &K, slot: &Slot<V>) -> bool {
        let mut state = self.write();
        if !state.maps_to(key, slot) || slot.is_available() {
            return false;
        }
        let watched = state
            .waiters
            .values()
            .any(|waiter| std::ptr::eq(&*waiter.slot, slot));
        if watched {
            return false;
        }
        state.entries.remove(key);
        true
    }

    /// Close the table: refuse new waiters, interrupt every registered one,
    /// and wipe all entries. Only the first call sweeps anything.
    pub(crate) fn close(&self) -> Sweep {
        let mut state = self.write();
        if state.closed {
            return Sweep {
                interrupted: 0,
                wiped: 0,
            };
        }
        state.closed = true;

        for waiter in state.waiters.values() {
            waiter.interrupt.raise();
            waiter.slot.wake_all();
        }
        let interrupted = state.waiters.len();
        let wiped = state.entries.len();
        state.entries.clear();

        Sweep { interrupted, wiped }
    }

    /// Number of callers currently registered as waiting.
    #[cfg(test)]
    pub(crate) fn waiting(&self) -> usize {
        self.read().waiters.len()
    }

    /// The slot currently stored under `key`, if any. Takes the read lock.
    pub(crate) fn slot(&self, key: &K) -> Option<Arc<Slot<V>>> {
        self.read().entries.get(key).cloned()
    }

    /// Visit every slot under the read lock until `visit` breaks.
    pub(crate) fn for_each_slot<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &Slot<V>) -> ControlFlow<()>,
    {
        let state = self.read();
        for (key, slot) in &state.entries {
            if visit(key, slot).is_break() {
                return;
            }
        }
    }
}
