//! Map construction options.

/// Options for [`HandoffMap::with_config`](crate::HandoffMap::with_config).
///
/// # Example
///
/// ```rust
/// use keyed_handoff::{HandoffMap, MapConfig};
///
/// let map: HandoffMap<u32, String> =
///     HandoffMap::with_config(MapConfig::default().with_label("jobs").with_initial_capacity(64));
/// assert_eq!(map.len(), Ok(0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapConfig {
    /// Number of keys the entry map is pre-sized for.
    pub initial_capacity: usize,
    /// Name recorded as the `map` field on every log event.
    pub label: Option<String>,
}

impl MapConfig {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
