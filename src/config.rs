//! Index configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default size of the dense record tier.
pub const DEFAULT_LOW_ID_THRESHOLD: u64 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IndexConfig {
    /// Record hashes below this value live in a fixed array slot; all others
    /// go through the hash table. Pairs always take the hash table.
    pub low_id_threshold: u64,
}

impl IndexConfig {
    #[must_use]
    pub fn with_low_id_threshold(mut self, threshold: u64) -> Self {
        self.low_id_threshold = threshold;
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            low_id_threshold: DEFAULT_LOW_ID_THRESHOLD,
        }
    }
}
