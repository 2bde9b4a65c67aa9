use tracing::trace;

use crate::HandoffError;

/// Terminal engine of a shut-down map. Holds no state, so one instance
/// serves every closed map regardless of key and value types.
#[derive(Debug)]
pub(crate) struct ClosedEngine;

pub(crate) static CLOSED: ClosedEngine = ClosedEngine;

impl ClosedEngine {
    pub(crate) fn reject<T>(&self, op: &'static str) -> Result<T, HandoffError> {
        trace!(op, "rejected by closed map");
        Err(HandoffError::NotActive)
    }
}
