//! Block-version-aware proof-of-work hash selection.
//!
//! Each major version pins exactly one slow-hash variant:
//! - v1: original CryptoNight
//! - v2..v5: the CN dark / lite / turtle family
//! - v6: Chukwa

use redstone_types::block::{
    BLOCK_MAJOR_VERSION_1, BLOCK_MAJOR_VERSION_2, BLOCK_MAJOR_VERSION_3, BLOCK_MAJOR_VERSION_4,
    BLOCK_MAJOR_VERSION_5, BLOCK_MAJOR_VERSION_6,
};
use redstone_types::{ConsensusError, HashAlgorithmId, MajorVersion};

/// Version → hash function table.
///
/// Returns identifiers only; the caller matches on [`HashAlgorithmId`] to run
/// the actual hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashDispatcher;

impl HashDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// The hash function blocks of `major_version` are mined with.
    pub fn hash_algorithm_for(
        &self,
        major_version: MajorVersion,
    ) -> Result<HashAlgorithmId, ConsensusError> {
        match major_version {
            BLOCK_MAJOR_VERSION_1 => Ok(HashAlgorithmId::CnSlowHashV0),
            BLOCK_MAJOR_VERSION_2 => Ok(HashAlgorithmId::CnDarkSlowHashV1),
            BLOCK_MAJOR_VERSION_3 => Ok(HashAlgorithmId::CnDarkLiteSlowHashV1),
            BLOCK_MAJOR_VERSION_4 => Ok(HashAlgorithmId::CnLiteSlowHashV1),
            BLOCK_MAJOR_VERSION_5 => Ok(HashAlgorithmId::CnTurtleLiteSlowHashV2),
            BLOCK_MAJOR_VERSION_6 => Ok(HashAlgorithmId::Chukwa),
            other => Err(ConsensusError::UnsupportedBlockVersion(other)),
        }
    }
}
