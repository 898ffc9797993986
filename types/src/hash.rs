//! Proof-of-work hash values and hash function identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output of a proof-of-work hash function, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PowHash([u8; 32]);

impl Default for PowHash {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PowHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for PowHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PowHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "\u{2026})")
    }
}

impl fmt::Display for PowHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Identifies which slow-hash function a block's proof of work must use.
///
/// The hash implementations live outside the consensus core; callers match
/// on this enum to pick one, so adding a variant is a compile error at every
/// call site that has not learned about it yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmId {
    /// Original CryptoNight.
    CnSlowHashV0,
    CnDarkSlowHashV1,
    CnDarkLiteSlowHashV1,
    CnLiteSlowHashV1,
    CnTurtleLiteSlowHashV2,
    /// Argon2id-based Chukwa.
    Chukwa,
}

impl HashAlgorithmId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CnSlowHashV0 => "cn_slow_hash_v0",
            Self::CnDarkSlowHashV1 => "cn_dark_slow_hash_v1",
            Self::CnDarkLiteSlowHashV1 => "cn_dark_lite_slow_hash_v1",
            Self::CnLiteSlowHashV1 => "cn_lite_slow_hash_v1",
            Self::CnTurtleLiteSlowHashV2 => "cn_turtle_lite_slow_hash_v2",
            Self::Chukwa => "chukwa_slow_hash",
        }
    }
}

impl fmt::Display for HashAlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
