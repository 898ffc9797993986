//! The single entry point block validation calls.

use serde::{Deserialize, Serialize};

use redstone_types::{
    ChainParams, ConsensusError, DifficultySample, HashAlgorithmId, Height, MajorVersion,
    MinorVersion, NetworkId, RuleSet,
};
use redstone_work::{DifficultyEngine, HashDispatcher, Retarget};

use crate::fork_schedule::FixedForkSchedule;
use crate::rule_table::RuleTable;
use crate::software_fork::{SoftwareForkTracker, VoteTally, VoteWindow};

/// Upgrade signals observed alongside a resolution. Never affects validity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAdvisory {
    pub tally: VoteTally,
    pub voted_fork_index: usize,
    pub blocks_until_next_fork: Option<u64>,
}

/// Everything a block at `height` is validated against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub height: Height,
    pub rule_set: RuleSet,
    pub major_version: MajorVersion,
    pub minor_version: MinorVersion,
    pub hash_algorithm: HashAlgorithmId,
    pub retarget: Retarget,
    pub advisory: UpgradeAdvisory,
}

/// Composes the rule table, fork schedule, hash dispatcher and difficulty
/// engine built from one [`ChainParams`].
///
/// Immutable after construction; share it freely across threads.
#[derive(Clone, Debug)]
pub struct ConsensusResolver {
    params: ChainParams,
    schedule: FixedForkSchedule,
    software: SoftwareForkTracker,
    table: RuleTable,
    dispatcher: HashDispatcher,
    engine: DifficultyEngine,
}

impl ConsensusResolver {
    /// Validate `params` and build every lookup structure from them.
    pub fn new(params: ChainParams) -> Result<Self, ConsensusError> {
        params.validate()?;
        let schedule = FixedForkSchedule::new(&params.upgrades)?;
        let software = SoftwareForkTracker::new(&params.upgrades)?;
        let engine = DifficultyEngine::new(params.difficulty.clone());
        let table = RuleTable::new(&params, &schedule, &engine)?;

        tracing::info!(
            network = %params.network,
            rows = table.len(),
            latest_version = schedule.latest_version(),
            fork_index = software.current_fork_index(),
            "consensus rules loaded"
        );

        Ok(Self {
            params,
            schedule,
            software,
            table,
            dispatcher: HashDispatcher::new(),
            engine,
        })
    }

    pub fn for_network(network: NetworkId) -> Result<Self, ConsensusError> {
        Self::new(ChainParams::for_network(network))
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn schedule(&self) -> &FixedForkSchedule {
        &self.schedule
    }

    pub fn software(&self) -> &SoftwareForkTracker {
        &self.software
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn engine(&self) -> &DifficultyEngine {
        &self.engine
    }

    pub fn rule_set_at(&self, height: Height) -> Result<&RuleSet, ConsensusError> {
        self.table.rule_set_at(height)
    }

    /// Hash function a block at `height` must be mined with.
    pub fn hash_algorithm_at(&self, height: Height) -> Result<HashAlgorithmId, ConsensusError> {
        let rule_set = self.table.rule_set_at(height)?;
        self.dispatcher.hash_algorithm_for(rule_set.major_version)
    }

    /// An empty vote window sized for this deployment.
    pub fn new_vote_window(&self) -> VoteWindow {
        self.software.new_vote_window()
    }

    /// Resolve the rules, hash function and required difficulty for the
    /// block at `height`.
    ///
    /// `samples` are the accepted blocks immediately preceding `height`,
    /// oldest first. `votes` only feeds the advisory part of the result.
    pub fn resolve(
        &self,
        height: Height,
        votes: &VoteWindow,
        samples: &[DifficultySample],
    ) -> Result<Resolution, ConsensusError> {
        let rule_set = self.table.rule_set_at(height)?.clone();
        let hash_algorithm = self.dispatcher.hash_algorithm_for(rule_set.major_version)?;
        let retarget = self.engine.next_difficulty(height, samples, &rule_set)?;

        let advisory = UpgradeAdvisory {
            tally: self.software.tally(votes, rule_set.major_version),
            voted_fork_index: self.software.voted_fork_index(height),
            blocks_until_next_fork: self.software.blocks_until_next_fork(height),
        };

        Ok(Resolution {
            height,
            major_version: rule_set.major_version,
            minor_version: rule_set.minor_version_default,
            hash_algorithm,
            retarget,
            advisory,
            rule_set,
        })
    }

    /// Advisory: whether peers have moved past the fork this build supports.
    pub fn is_software_behind(&self, chain_height: Height, highest_peer_fork_index: usize) -> bool {
        self.software
            .is_software_behind(chain_height, highest_peer_fork_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redstone_types::{Difficulty, DifficultyAlgorithm};

    fn steady(count: u64, difficulty: Difficulty, target: u64) -> Vec<DifficultySample> {
        (0..count)
            .map(|i| {
                DifficultySample::new(
                    1_500_000_000 + i * target,
                    u128::from(difficulty) * u128::from(i + 1),
                )
            })
            .collect()
    }

    #[test]
    fn builds_every_preset() {
        for network in [NetworkId::Live, NetworkId::Test, NetworkId::Dev] {
            assert!(ConsensusResolver::for_network(network).is_ok());
        }
    }

    #[test]
    fn rejects_invalid_params() {
        let mut params = ChainParams::mainnet();
        params.upgrades.schedule[2].height = 1;
        assert!(matches!(
            ConsensusResolver::new(params),
            Err(ConsensusError::InvalidForkSchedule(_))
        ));
    }

    #[test]
    fn resolves_lwma_era_block() {
        let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
        let samples = steady(60, 1_000_000, 20);
        let votes = resolver.new_vote_window();
        let res = resolver.resolve(300_000, &votes, &samples).unwrap();
        assert_eq!(res.major_version, 5);
        assert_eq!(res.minor_version, 0);
        assert_eq!(res.hash_algorithm, HashAlgorithmId::CnTurtleLiteSlowHashV2);
        assert_eq!(res.retarget.algorithm, DifficultyAlgorithm::Lwma2V2);
        assert_eq!(res.retarget.difficulty, 990_000);
        assert_eq!(res.advisory.voted_fork_index, 1);
        assert_eq!(res.advisory.blocks_until_next_fork, Some(200_000));
        assert!(!res.advisory.tally.supermajority);
    }

    #[test]
    fn difficulty_errors_propagate() {
        let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
        let votes = resolver.new_vote_window();
        assert_eq!(
            resolver.resolve(300_000, &votes, &steady(10, 100, 20)),
            Err(ConsensusError::InsufficientHistory {
                required: 51,
                available: 10,
            })
        );
    }

    #[test]
    fn out_of_range_height_fails_first() {
        let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
        let votes = resolver.new_vote_window();
        assert!(matches!(
            resolver.resolve(u64::MAX, &votes, &[]),
            Err(ConsensusError::HeightOutOfRange { .. })
        ));
    }

    #[test]
    fn hash_algorithm_by_height() {
        let resolver = ConsensusResolver::for_network(NetworkId::Live).unwrap();
        assert_eq!(
            resolver.hash_algorithm_at(0).unwrap(),
            HashAlgorithmId::CnSlowHashV0
        );
        assert_eq!(
            resolver.hash_algorithm_at(999_999_999).unwrap(),
            HashAlgorithmId::Chukwa
        );
    }
}
