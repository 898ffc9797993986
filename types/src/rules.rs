//! The rule set in force over a contiguous range of heights.

use serde::{Deserialize, Serialize};

use crate::block::Height;
use crate::difficulty::DifficultyAlgorithm;

/// Consensus parameters that apply from `activation_height` until the next row.
///
/// Built once by the rule table from [`ChainParams`](crate::ChainParams) and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub activation_height: Height,

    // ── Block versions ──────────────────────────────────────────────────
    pub major_version: u8,
    pub minor_version_default: u8,

    // ── Difficulty ──────────────────────────────────────────────────────
    pub difficulty_algorithm: DifficultyAlgorithm,
    pub difficulty_target: u64,
    pub difficulty_window: usize,
    pub difficulty_cut: usize,
    pub difficulty_lag: usize,

    // ── Mixin ───────────────────────────────────────────────────────────
    pub min_mixin: u64,
    /// `u64::MAX` while mixin is unbounded.
    pub max_mixin: u64,
    pub default_mixin: u64,

    // ── Block size and extra field ──────────────────────────────────────
    pub max_block_size_initial: u64,
    pub max_block_size_growth_numerator: u64,
    pub max_block_size_growth_denominator: u64,
    pub max_extra_size: u64,
    pub granted_full_reward_zone: u64,

    // ── Fees and dust ───────────────────────────────────────────────────
    pub dust_threshold: u64,
    pub fusion_dust_threshold: u64,
    pub minimum_fee: u64,

    // ── Transaction shape ───────────────────────────────────────────────
    pub fusion_tx_max_size: u64,
    pub fusion_tx_min_input_count: u64,
    pub fusion_tx_min_in_out_count_ratio: u64,
    /// Outputs allowed per input for ordinary transactions, once enforced.
    pub normal_tx_max_output_ratio: Option<u64>,
    pub max_output_size_node: u64,
    pub max_output_size_client: u64,

    // ── Timestamps ──────────────────────────────────────────────────────
    pub block_future_time_limit: u64,
    pub timestamp_check_window: usize,
}

impl RuleSet {
    /// Samples the difficulty algorithm of this row consumes.
    pub fn difficulty_blocks_count(&self) -> usize {
        if self.difficulty_algorithm.is_lwma() {
            self.difficulty_window + 1
        } else {
            self.difficulty_window + self.difficulty_lag
        }
    }

    /// Whether `mixin` lies within this row's bounds.
    pub fn is_mixin_allowed(&self, mixin: u64) -> bool {
        (self.min_mixin..=self.max_mixin).contains(&mixin)
    }
}
