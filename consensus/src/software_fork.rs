//! Voted software-fork tracking. Advisory only.
//!
//! Two signals tell an operator their node needs upgrading:
//! - **Version votes**: the major version miners declare in recent blocks,
//!   kept in a bounded [`VoteWindow`]. A supermajority for the next version
//!   means the network is ready to move on.
//! - **Software fork index**: which entry of the fork height table the chain
//!   has reached, compared against the index this build supports and the
//!   highest index peers advertise.
//!
//! Nothing here decides block validity. The consensus-binding schedule is
//! [`FixedForkSchedule`](crate::FixedForkSchedule).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use redstone_types::{BlockVersionVote, ConsensusError, Height, UpgradeParams};

/// The most recent block version votes, one per block, oldest first.
#[derive(Clone, Debug)]
pub struct VoteWindow {
    votes: VecDeque<BlockVersionVote>,
    capacity: usize,
}

impl VoteWindow {
    pub fn new(capacity: usize) -> Self {
        // Grows on demand; capacity comes from configuration.
        Self {
            votes: VecDeque::new(),
            capacity,
        }
    }

    /// Window pre-filled from history; out-of-order votes are skipped.
    pub fn from_votes(capacity: usize, votes: impl IntoIterator<Item = BlockVersionVote>) -> Self {
        let mut window = Self::new(capacity);
        for vote in votes {
            window.push(vote);
        }
        window
    }

    /// Append the vote of the next block, evicting the oldest once full.
    ///
    /// Returns `false` and ignores the vote if its height does not follow the
    /// newest vote already held.
    pub fn push(&mut self, vote: BlockVersionVote) -> bool {
        if let Some(newest) = self.votes.back() {
            if vote.height <= newest.height {
                tracing::debug!(
                    height = vote.height,
                    newest = newest.height,
                    "ignoring out-of-order version vote"
                );
                return false;
            }
        }
        if self.capacity == 0 {
            return false;
        }
        while self.votes.len() >= self.capacity {
            self.votes.pop_front();
        }
        self.votes.push_back(vote);
        true
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.votes.len() == self.capacity
    }

    pub fn latest_height(&self) -> Option<Height> {
        self.votes.back().map(|v| v.height)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockVersionVote> {
        self.votes.iter()
    }

    /// Votes declaring `major_version` or newer.
    pub fn count_at_least(&self, major_version: u8) -> usize {
        self.votes
            .iter()
            .filter(|v| v.major_version >= major_version)
            .count()
    }
}

/// Outcome of counting the vote window for the next major version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub candidate_version: u8,
    pub votes_for: usize,
    pub window_len: usize,
    pub capacity: usize,
    /// `votes_for` reached the threshold share of a full window.
    pub supermajority: bool,
    /// Where the upgrade would land: newest vote height plus the upgrade window.
    pub projected_activation: Option<Height>,
}

/// Advisory fork state of this build against the network.
#[derive(Clone, Debug)]
pub struct SoftwareForkTracker {
    fork_heights: Vec<Height>,
    current_fork_index: usize,
    voting_threshold_pct: u8,
    voting_window: usize,
    upgrade_window: u64,
}

impl SoftwareForkTracker {
    pub fn new(upgrades: &UpgradeParams) -> Result<Self, ConsensusError> {
        upgrades.validate_fork_table()?;
        let current_fork_index = upgrades.current_fork_index();
        let voting_window = usize::try_from(upgrades.voting_window).map_err(|_| {
            ConsensusError::InvalidForkSchedule(format!(
                "voting window {} does not fit in memory",
                upgrades.voting_window
            ))
        })?;

        Ok(Self {
            fork_heights: upgrades.fork_heights.clone(),
            current_fork_index,
            voting_threshold_pct: upgrades.voting_threshold_pct,
            voting_window,
            upgrade_window: upgrades.upgrade_window,
        })
    }

    /// An empty vote window sized for this deployment.
    pub fn new_vote_window(&self) -> VoteWindow {
        VoteWindow::new(self.voting_window)
    }

    pub fn fork_heights(&self) -> &[Height] {
        &self.fork_heights
    }

    /// The fork index this build supports.
    pub fn current_fork_index(&self) -> usize {
        self.current_fork_index
    }

    /// How many fork heights the chain has passed.
    ///
    /// A fork counts once the chain is strictly above its height. Index 0
    /// covers everything up to and including the first fork height, so this
    /// is 0 at genesis and whenever the fork table is empty.
    pub fn voted_fork_index(&self, chain_height: Height) -> usize {
        self.fork_heights.partition_point(|&h| h < chain_height)
    }

    /// Whether peers have moved to a fork this build does not support.
    ///
    /// A peer-advertised index only counts once the chain has actually
    /// passed the corresponding fork height.
    pub fn is_software_behind(&self, chain_height: Height, highest_peer_fork_index: usize) -> bool {
        if self.fork_heights.is_empty() {
            return false;
        }
        let effective = highest_peer_fork_index.min(self.voted_fork_index(chain_height));
        let behind = effective > self.current_fork_index;
        if behind {
            tracing::warn!(
                chain_height,
                supported = self.current_fork_index,
                network = effective,
                "network has forked past the version this node supports, upgrade required"
            );
        }
        behind
    }

    /// Blocks left until the next fork height not yet passed, if any.
    pub fn blocks_until_next_fork(&self, chain_height: Height) -> Option<u64> {
        self.fork_heights
            .get(self.voted_fork_index(chain_height))
            .map(|&h| h - chain_height)
    }

    /// Count votes in `window` for the version after `current_major`.
    pub fn tally(&self, window: &VoteWindow, current_major: u8) -> VoteTally {
        let candidate_version = current_major.saturating_add(1);
        let votes_for = window.count_at_least(candidate_version);
        let capacity = window.capacity();
        let supermajority = capacity > 0
            && votes_for as u128 * 100 >= u128::from(self.voting_threshold_pct) * capacity as u128;
        let projected_activation = if supermajority {
            window
                .latest_height()
                .map(|h| h.saturating_add(self.upgrade_window))
        } else {
            None
        };
        VoteTally {
            candidate_version,
            votes_for,
            window_len: window.len(),
            capacity,
            supermajority,
            projected_activation,
        }
    }
}
