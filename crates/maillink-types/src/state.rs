//! Durable processing state.

use serde::{Deserialize, Serialize};

/// Record of the last forwarded message, persisted as `{"last_uid": N}`.
///
/// A fresh install starts at `last_uid = 0`. The value only ever moves
/// forward; see [`ProcessingState::advance`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    /// Highest mailbox uid delivered by a forward cycle.
    #[serde(default)]
    pub last_uid: u32,
}

impl ProcessingState {
    /// Raise `last_uid` to `uid` if it is higher. Returns whether it changed.
    pub fn advance(&mut self, uid: u32) -> bool {
        if uid > self.last_uid {
            self.last_uid = uid;
            true
        } else {
            false
        }
    }
}
