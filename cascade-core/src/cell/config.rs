//! Cell configuration.

use serde::{Deserialize, Serialize};

/// Default number of read-compute-publish cycles before an update gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 16;

/// Tuning for [`CascadeCell`](super::CascadeCell) updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// How many times an update recomputes after losing a publish race.
    /// Always at least 1.
    pub max_attempts: usize,
}

impl CellConfig {
    /// Set the number of attempts. Zero is treated as one.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
