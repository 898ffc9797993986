//! Top-level error type shared across crates.

use thiserror::Error;

/// Every way rule, fork or difficulty resolution can fail.
///
/// Callers must treat any of these as "reject the block"; nothing in the
/// consensus core substitutes a default when resolution fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("height {height} is outside the supported range (max {max})")]
    HeightOutOfRange { height: u64, max: u64 },

    #[error("unsupported block major version {0}")]
    UnsupportedBlockVersion(u8),

    #[error("insufficient difficulty history: need {required} samples, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid fork schedule: {0}")]
    InvalidForkSchedule(String),

    #[error("config error: {0}")]
    Config(String),
}
