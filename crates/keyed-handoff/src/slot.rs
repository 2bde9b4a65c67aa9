//! Single-assignment rendezvous cell.
//!
//! A [`Slot`] starts empty and can be filled exactly once. Any number of
//! threads can block on it; filling it wakes all of them. A blocked thread can
//! also be released early through its own [`Interrupt`], which is how a
//! shutdown unblocks waiters that will never see a value.

use std::time::{Duration, Instant};

use crate::sync::{AtomicBool, Condvar, Mutex, Ordering};

/// How long a wait may last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deadline {
    /// Wait until signaled or interrupted.
    Never,
    /// Give up once this instant has passed.
    At(Instant),
}

impl Deadline {
    /// A deadline `timeout` from now. A zero timeout only checks the current
    /// state; a timeout too large to represent waits forever.
    pub(crate) fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => Deadline::At(at),
            None => Deadline::Never,
        }
    }
}

/// Per-waiter cancellation flag.
///
/// Raising it does not wake anyone by itself; the raiser must follow up with
/// [`Slot::wake_all`] on the slot the waiter is blocked on.
#[derive(Debug)]
pub(crate) struct Interrupt {
    raised: AtomicBool,
}

impl Interrupt {
    pub(crate) fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    pub(crate) fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// How a wait on a [`Slot`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WaitOutcome<V> {
    /// The slot was signaled; carries a copy of its value.
    Ready(V),
    /// The deadline passed before the slot was signaled.
    TimedOut,
    /// The waiter's [`Interrupt`] was raised before the slot was signaled.
    Interrupted,
}

/// Write-once cell with broadcast wake-up.
///
/// `value` being `Some` is the signaled state. It never goes back to `None`
/// and is never replaced.
pub(crate) struct Slot<V> {
    value: Mutex<Option<V>>,
    signal: Condvar,
}

impl<V: Clone> Slot<V> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Whether a value has been assigned. Never blocks beyond the slot lock.
    pub(crate) fn is_available(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Assign `value` unless the slot is already signaled.
    ///
    /// Returns `None` when the value was stored. Otherwise the new value is
    /// dropped and a copy of the value already present is returned.
    pub(crate) fn try_set(&self, value: V) -> Option<V> {
        let mut current = self.value.lock();
        if let Some(existing) = current.as_ref() {
            return Some(existing.clone());
        }
        *current = Some(value);
        drop(current);
        self.signal.notify_all();
        None
    }

    /// The value if already signaled, without waiting.
    pub(crate) fn peek(&self) -> Option<V> {
        self.value.lock().clone()
    }

    /// Block until the slot is signaled, `deadline` passes, or `interrupt`
    /// is raised.
    ///
    /// A value that is already present wins over a raised interrupt.
    pub(crate) fn await_value(&self, deadline: Deadline, interrupt: &Interrupt) -> WaitOutcome<V> {
        let mut current = self.value.lock();
        loop {
            if let Some(value) = current.as_ref() {
                return WaitOutcome::Ready(value.clone());
            }
            if interrupt.is_raised() {
                return WaitOutcome::Interrupted;
            }
            match deadline {
                Deadline::Never => current = self.signal.wait(current),
                Deadline::At(at) => {
                    if Instant::now() >= at {
                        return WaitOutcome::TimedOut;
                    }
                    // Timing out is re-checked at the top of the loop, after
                    // the value and the interrupt.
                    let (guard, _timed_out) = self.signal.wait_until(current, at);
                    current = guard;
                }
            }
        }
    }

    /// Wake every thread blocked in [`Slot::await_value`] so it re-checks its
    /// interrupt.
    pub(crate) fn wake_all(&self) {
        // Taking the lock orders this wake after any waiter's interrupt check.
        let _current = self.value.lock();
        self.signal.notify_all();
    }
}
