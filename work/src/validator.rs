//! PoW target check.

use redstone_types::{Difficulty, PowHash};

/// Whether `hash` satisfies `difficulty`.
///
/// The hash is read as a little-endian 256-bit integer; it passes when
/// `hash * difficulty` still fits in 256 bits.
pub fn check_hash(hash: &PowHash, difficulty: Difficulty) -> bool {
    let difficulty = u128::from(difficulty);
    let mut carry: u128 = 0;
    for word in hash.as_bytes().chunks_exact(8) {
        let mut le = [0u8; 8];
        le.copy_from_slice(word);
        let product = u128::from(u64::from_le_bytes(le)) * difficulty + carry;
        carry = product >> 64;
    }
    carry == 0
}
