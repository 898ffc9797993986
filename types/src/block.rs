//! Block heights, block versions, and the version votes miners publish.

use serde::{Deserialize, Serialize};

/// Position of a block in the chain. Genesis is height 0.
pub type Height = u64;

pub type MajorVersion = u8;
pub type MinorVersion = u8;

pub const BLOCK_MAJOR_VERSION_1: MajorVersion = 1;
pub const BLOCK_MAJOR_VERSION_2: MajorVersion = 2;
pub const BLOCK_MAJOR_VERSION_3: MajorVersion = 3;
pub const BLOCK_MAJOR_VERSION_4: MajorVersion = 4;
pub const BLOCK_MAJOR_VERSION_5: MajorVersion = 5;
pub const BLOCK_MAJOR_VERSION_6: MajorVersion = 6;

pub const BLOCK_MINOR_VERSION_0: MinorVersion = 0;
/// Minor version miners set while signalling readiness for the next major upgrade.
pub const BLOCK_MINOR_VERSION_1: MinorVersion = 1;

/// Every major version this build knows how to validate, oldest first.
pub const SUPPORTED_MAJOR_VERSIONS: [MajorVersion; 6] = [
    BLOCK_MAJOR_VERSION_1,
    BLOCK_MAJOR_VERSION_2,
    BLOCK_MAJOR_VERSION_3,
    BLOCK_MAJOR_VERSION_4,
    BLOCK_MAJOR_VERSION_5,
    BLOCK_MAJOR_VERSION_6,
];

/// The major version a miner declared for a block it mined.
///
/// Immutable once the block is part of history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockVersionVote {
    pub height: Height,
    pub major_version: MajorVersion,
}

impl BlockVersionVote {
    pub fn new(height: Height, major_version: MajorVersion) -> Self {
        Self {
            height,
            major_version,
        }
    }
}
