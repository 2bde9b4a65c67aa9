//! Behaviour bound to the map's lifecycle phase.
//!
//! A map starts out served by a [`LiveEngine`] and, after shutdown, by the
//! shared [`ClosedEngine`]. [`Engine`] is the tagged handle the facade holds
//! and swaps; every operation is dispatched on the tag.

mod closed;
mod live;

use std::hash::Hash;

pub(crate) use closed::{CLOSED, ClosedEngine};
pub(crate) use live::LiveEngine;

use crate::HandoffError;
use crate::slot::Deadline;
use crate::sync::Arc;

pub(crate) enum Engine<K, V> {
    Live(Arc<LiveEngine<K, V>>),
    Closed(&'static ClosedEngine),
}

impl<K, V> Clone for Engine<K, V> {
    fn clone(&self) -> Self {
        match self {
            Engine::Live(live) => Engine::Live(live.clone()),
            Engine::Closed(closed) => Engine::Closed(*closed),
        }
    }
}

impl<K, V> Engine<K, V> {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Engine::Live(_))
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Engine<K, V> {
    pub(crate) fn put(&self, key: K, value: V) -> Result<Option<V>, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.put(key, value)),
            Engine::Closed(closed) => closed.reject("put"),
        }
    }

    pub(crate) fn offer(&self, key: K, value: V) -> Result<Option<V>, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.offer(key, value)),
            Engine::Closed(closed) => closed.reject("offer"),
        }
    }

    pub(crate) fn take(&self, key: &K, deadline: Deadline) -> Result<Option<V>, HandoffError> {
        match self {
            Engine::Live(live) => live.take(key, deadline),
            Engine::Closed(closed) => closed.reject("take"),
        }
    }

    pub(crate) fn remove(&self, key: &K) -> Result<Option<V>, HandoffError> {
        match self {
            Engine::Live(live) => live.remove(key),
            Engine::Closed(closed) => closed.reject("remove"),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Result<Option<V>, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.get(key)),
            Engine::Closed(closed) => closed.reject("get"),
        }
    }

    pub(crate) fn is_key_available(&self, key: &K) -> Result<bool, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.is_key_available(key)),
            Engine::Closed(closed) => closed.reject("is_key_available"),
        }
    }

    pub(crate) fn len(&self) -> Result<usize, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.len()),
            Engine::Closed(closed) => closed.reject("len"),
        }
    }

    pub(crate) fn is_empty(&self) -> Result<bool, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.is_empty()),
            Engine::Closed(closed) => closed.reject("is_empty"),
        }
    }

    pub(crate) fn clear(&self) -> Result<(), HandoffError> {
        match self {
            Engine::Live(live) => {
                live.clear();
                Ok(())
            }
            Engine::Closed(closed) => closed.reject("clear"),
        }
    }

    /// Collection views and bulk insertion: refused as unsupported while
    /// live, as not active once closed.
    pub(crate) fn unsupported<T>(&self, op: &'static str) -> Result<T, HandoffError> {
        match self {
            Engine::Live(_) => Err(HandoffError::Unsupported(op)),
            Engine::Closed(closed) => closed.reject(op),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone + PartialEq> Engine<K, V> {
    pub(crate) fn contains_value(&self, value: &V) -> Result<bool, HandoffError> {
        match self {
            Engine::Live(live) => Ok(live.contains_value(value)),
            Engine::Closed(closed) => closed.reject("contains_value"),
        }
    }
}
