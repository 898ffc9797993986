#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use redstone_consensus::ConsensusResolver;
use redstone_types::{DifficultySample, NetworkId};

#[derive(Debug, Arbitrary)]
struct Input {
    height: u64,
    /// (timestamp, per-block difficulty) pairs; timestamps may go backwards.
    blocks: Vec<(u64, u32)>,
}

fuzz_target!(|input: Input| {
    let Ok(resolver) = ConsensusResolver::for_network(NetworkId::Dev) else {
        return;
    };
    let mut cumulative = 0u128;
    let samples: Vec<DifficultySample> = input
        .blocks
        .iter()
        .map(|&(ts, diff)| {
            cumulative += u128::from(diff);
            DifficultySample::new(ts, cumulative)
        })
        .collect();

    let votes = resolver.new_vote_window();
    // Hostile histories may fail with an error but must never panic, and a
    // successful retarget is never below 1.
    if let Ok(res) = resolver.resolve(input.height % 100, &votes, &samples) {
        assert!(res.retarget.difficulty >= 1);
    }
});
