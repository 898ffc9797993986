#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 32 bytes of hash followed by an 8-byte difficulty.
    if data.len() >= 40 {
        let mut hash_bytes = [0u8; 32];
        hash_bytes.copy_from_slice(&data[..32]);
        let difficulty = u64::from_le_bytes([
            data[32], data[33], data[34], data[35],
            data[36], data[37], data[38], data[39],
        ]);
        let hash = redstone_types::PowHash::new(hash_bytes);

        let accepted = redstone_work::check_hash(&hash, difficulty);
        // Anything passes at difficulty 1 or below; a stricter target never
        // accepts what a looser one rejected.
        if difficulty <= 1 {
            assert!(accepted);
        }
        if accepted && difficulty > 1 {
            assert!(redstone_work::check_hash(&hash, difficulty - 1));
        }
    }
});
