//! Difficulty values, history samples, and retarget algorithm identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

/// Required proof-of-work strength of a single block.
pub type Difficulty = u64;

/// Running sum of [`Difficulty`] along a chain.
pub type CumulativeDifficulty = u128;

/// One accepted block as seen by the retarget algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DifficultySample {
    pub timestamp: Timestamp,
    pub cumulative_difficulty: CumulativeDifficulty,
}

impl DifficultySample {
    pub fn new(timestamp_secs: u64, cumulative_difficulty: CumulativeDifficulty) -> Self {
        Self {
            timestamp: Timestamp::new(timestamp_secs),
            cumulative_difficulty,
        }
    }
}

/// Retarget algorithm in force at a height.
///
/// Variants are declared in activation order, so the derived `Ord` matches
/// the order in which they take over along the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyAlgorithm {
    /// Sorted-timestamp window average with symmetric cut and lag.
    Classic,
    /// Classic averaging over the long Zawy window.
    Zawy,
    /// Linearly weighted moving average, first revision.
    Lwma2,
    /// LWMA-2 with the sudden-drop rule changed from override to floor.
    Lwma2V2,
    /// LWMA-2 third parameter revision.
    Lwma2V3,
}

impl DifficultyAlgorithm {
    pub fn is_lwma(&self) -> bool {
        matches!(self, Self::Lwma2 | Self::Lwma2V2 | Self::Lwma2V3)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Zawy => "zawy",
            Self::Lwma2 => "lwma2",
            Self::Lwma2V2 => "lwma2-v2",
            Self::Lwma2V3 => "lwma2-v3",
        }
    }
}

impl fmt::Display for DifficultyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
