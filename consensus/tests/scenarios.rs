//! End-to-end resolution scenarios against the built-in presets.

use redstone_consensus::{ConsensusResolver, Resolution, VoteWindow};
use redstone_types::block::SUPPORTED_MAJOR_VERSIONS;
use redstone_types::{
    BlockVersionVote, ChainParams, ConsensusError, DifficultyAlgorithm, DifficultySample,
    HashAlgorithmId, NetworkId,
};
use redstone_work::{HashDispatcher, RetargetWarning};

const T: u64 = 20;

fn steady(count: u64, difficulty: u64) -> Vec<DifficultySample> {
    (0..count)
        .map(|i| {
            DifficultySample::new(
                1_600_000_000 + i * T,
                u128::from(difficulty) * u128::from(i + 1),
            )
        })
        .collect()
}

fn resolve_all(resolver: &ConsensusResolver, heights: &[u64]) -> Vec<Resolution> {
    let votes = resolver.new_vote_window();
    let samples = steady(3_000, 250_000);
    heights
        .iter()
        .map(|&h| resolver.resolve(h, &votes, &samples).unwrap())
        .collect()
}

#[test]
fn genesis_with_single_sample_is_insufficient() {
    let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
    let votes = resolver.new_vote_window();
    let result = resolver.resolve(0, &votes, &steady(1, 1));
    assert_eq!(
        result,
        Err(ConsensusError::InsufficientHistory {
            required: 2,
            available: 1,
        })
    );
}

#[test]
fn equal_timestamps_clamp_and_warn() {
    let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
    let votes = resolver.new_vote_window();
    let samples: Vec<_> = (0..15)
        .map(|i| DifficultySample::new(1_600_000_000, 1_000 * (i + 1)))
        .collect();
    let res = resolver.resolve(500, &votes, &samples).unwrap();
    assert_eq!(res.retarget.algorithm, DifficultyAlgorithm::Classic);
    assert!(matches!(
        res.retarget.warning,
        Some(RetargetWarning::DegenerateTimestamps { height: 500, .. })
    ));
    assert!(res.retarget.difficulty >= 1);
}

#[test]
fn software_behind_scenario() {
    let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
    assert_eq!(resolver.software().current_fork_index(), 0);
    assert!(!resolver.is_software_behind(249_999, 3));
    assert!(!resolver.is_software_behind(250_000, 1));
    assert!(resolver.is_software_behind(250_001, 1));
    assert!(!resolver.is_software_behind(900_000, 0));
}

#[test]
fn advisory_never_changes_validation() {
    let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
    let samples = steady(100, 1_000_000);
    let empty = resolver.new_vote_window();
    let full = VoteWindow::from_votes(
        4_320,
        (295_000..300_000).map(|h| BlockVersionVote::new(h, 6)),
    );

    let quiet = resolver.resolve(300_000, &empty, &samples).unwrap();
    let loud = resolver.resolve(300_000, &full, &samples).unwrap();
    assert!(loud.advisory.tally.supermajority);
    assert_eq!(loud.rule_set, quiet.rule_set);
    assert_eq!(loud.retarget, quiet.retarget);
    assert_eq!(loud.hash_algorithm, quiet.hash_algorithm);
    assert_eq!(loud.major_version, quiet.major_version);
}

#[test]
fn toml_round_trip_resolves_identically() {
    let params = ChainParams::mainnet();
    let text = params.to_toml_string().unwrap();
    let reloaded = ChainParams::from_toml_str(&text).unwrap();
    assert_eq!(reloaded, params);

    let heights = [1, 4, 999, 1_000, 99_999, 100_000, 200_000, 350_000, 500_000, 999_999_999];
    let before = resolve_all(&ConsensusResolver::new(params).unwrap(), &heights);
    let after = resolve_all(&ConsensusResolver::new(reloaded).unwrap(), &heights);
    assert_eq!(before, after);
}

#[test]
fn resolution_serializes_to_json_and_back() {
    let resolver = ConsensusResolver::for_network(NetworkId::Test).unwrap();
    let res = resolve_all(&resolver, &[1_500]).remove(0);
    let json = serde_json::to_string(&res).unwrap();
    let back: Resolution = serde_json::from_str(&json).unwrap();
    assert_eq!(back, res);
}

#[test]
fn every_version_in_the_schedule_has_a_hash() {
    let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
    let dispatcher = HashDispatcher::new();
    for version in SUPPORTED_MAJOR_VERSIONS {
        let height = resolver.schedule().activation_height(version).unwrap();
        assert_eq!(
            resolver.hash_algorithm_at(height).unwrap(),
            dispatcher.hash_algorithm_for(version).unwrap()
        );
    }
    assert_eq!(
        resolver.hash_algorithm_at(2).unwrap(),
        HashAlgorithmId::CnDarkLiteSlowHashV1
    );
}

#[test]
fn devnet_walks_every_algorithm_quickly() {
    let resolver = ConsensusResolver::for_network(NetworkId::Dev).unwrap();
    let samples = steady(3_000, 5_000);
    let votes = resolver.new_vote_window();
    let algos: Vec<_> = [0, 10, 20, 30, 40]
        .into_iter()
        .map(|h| resolver.resolve(h, &votes, &samples).unwrap().retarget.algorithm)
        .collect();
    assert_eq!(
        algos,
        [
            DifficultyAlgorithm::Classic,
            DifficultyAlgorithm::Zawy,
            DifficultyAlgorithm::Lwma2,
            DifficultyAlgorithm::Lwma2V2,
            DifficultyAlgorithm::Lwma2V3,
        ]
    );
}
