#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary text must either be rejected or yield params that build a
    // resolver without panicking.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(params) = redstone_types::ChainParams::from_toml_str(text) {
        let _ = redstone_consensus::ConsensusResolver::new(params);
    }
});
