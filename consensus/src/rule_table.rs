//! Height-indexed consensus rule sets.
//!
//! Every switch height of every parameter becomes a row boundary, so a lookup
//! is a single binary search and no row ever interpolates between values.

use redstone_types::{ChainParams, ConsensusError, DifficultyAlgorithm, Height, RuleSet};
use redstone_work::DifficultyEngine;

use crate::fork_schedule::FixedForkSchedule;

/// Immutable, height-ordered table of [`RuleSet`]s.
#[derive(Clone, Debug)]
pub struct RuleTable {
    rows: Vec<RuleSet>,
    max_block_number: Height,
}

impl RuleTable {
    pub fn new(
        params: &ChainParams,
        schedule: &FixedForkSchedule,
        engine: &DifficultyEngine,
    ) -> Result<Self, ConsensusError> {
        let max_block_number = params.limits.max_block_number;
        let boundaries = row_boundaries(params, schedule, max_block_number);
        let rows: Vec<RuleSet> = boundaries
            .into_iter()
            .map(|height| build_row(params, schedule, engine, height))
            .collect();

        if rows.is_empty() {
            return Err(ConsensusError::Config(
                "max_block_number leaves no valid heights".into(),
            ));
        }
        tracing::debug!(rows = rows.len(), max_block_number, "rule table built");

        Ok(Self {
            rows,
            max_block_number,
        })
    }

    /// The rule set governing the block at `height`.
    pub fn rule_set_at(&self, height: Height) -> Result<&RuleSet, ConsensusError> {
        if height >= self.max_block_number {
            return Err(ConsensusError::HeightOutOfRange {
                height,
                max: self.max_block_number,
            });
        }
        let idx = self
            .rows
            .partition_point(|row| row.activation_height <= height);
        // Row 0 starts at genesis, so idx >= 1 for every in-range height.
        self.rows
            .get(idx.saturating_sub(1))
            .ok_or(ConsensusError::HeightOutOfRange {
                height,
                max: self.max_block_number,
            })
    }

    /// Largest cumulative block size accepted at `height`.
    pub fn max_block_cumulative_size(&self, height: Height) -> Result<u64, ConsensusError> {
        let rule = self.rule_set_at(height)?;
        let growth = u128::from(height) * u128::from(rule.max_block_size_growth_numerator)
            / u128::from(rule.max_block_size_growth_denominator.max(1));
        let growth = u64::try_from(growth).unwrap_or(u64::MAX);
        Ok(rule.max_block_size_initial.saturating_add(growth))
    }

    pub fn rows(&self) -> &[RuleSet] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn max_block_number(&self) -> Height {
        self.max_block_number
    }
}

/// Every height at which some field of the rule set may change.
fn row_boundaries(
    params: &ChainParams,
    schedule: &FixedForkSchedule,
    max_block_number: Height,
) -> Vec<Height> {
    let d = &params.difficulty;
    let l = &params.limits;
    let mut heights = vec![
        0,
        d.zawy_block_index,
        d.lwma2_block_index,
        d.lwma2_block_index_v2,
        d.lwma2_block_index_v3,
        l.max_extra_size_v2_height,
        l.dust_threshold_v2_height,
        l.fusion_dust_threshold_height_v2,
        l.normal_tx_max_output_ratio_v1_height,
    ];
    heights.extend(params.mixin.stages.iter().map(|s| s.height));
    for activation in schedule.activation_heights() {
        heights.push(activation);
        // Minor-version signalling opens one upgrade window ahead.
        heights.push(activation.saturating_sub(params.upgrades.upgrade_window));
    }

    heights.retain(|&h| h < max_block_number);
    heights.sort_unstable();
    heights.dedup();
    heights
}

fn build_row(
    params: &ChainParams,
    schedule: &FixedForkSchedule,
    engine: &DifficultyEngine,
    height: Height,
) -> RuleSet {
    let l = &params.limits;
    let t = &params.timestamps;
    let algorithm = engine.algorithm_at(height);
    let window = engine.window_for(algorithm);

    let (min_mixin, max_mixin, default_mixin) = params
        .mixin
        .stages
        .iter()
        .rev()
        .find(|stage| stage.height <= height)
        .map_or((0, u64::MAX, params.mixin.default_v0), |stage| {
            (stage.min, stage.max, stage.default)
        });

    let block_future_time_limit = match algorithm {
        DifficultyAlgorithm::Classic | DifficultyAlgorithm::Zawy => t.future_time_limit,
        DifficultyAlgorithm::Lwma2 => t.future_time_limit_v3,
        DifficultyAlgorithm::Lwma2V2 | DifficultyAlgorithm::Lwma2V3 => t.future_time_limit_v4,
    };
    let timestamp_check_window = if algorithm.is_lwma() {
        t.check_window_v3
    } else {
        t.check_window
    };

    RuleSet {
        activation_height: height,
        major_version: schedule.version_at(height),
        minor_version_default: schedule.minor_version_at(height),
        difficulty_algorithm: algorithm,
        difficulty_target: params.difficulty.target_secs,
        difficulty_window: window.window,
        difficulty_cut: window.cut,
        difficulty_lag: window.lag,
        min_mixin,
        max_mixin,
        default_mixin,
        max_block_size_initial: l.max_block_size_initial,
        max_block_size_growth_numerator: l.max_block_size_growth_numerator,
        max_block_size_growth_denominator: l.max_block_size_growth_denominator,
        max_extra_size: if height >= l.max_extra_size_v2_height {
            l.max_extra_size_v2
        } else {
            l.max_extra_size
        },
        granted_full_reward_zone: l.granted_full_reward_zone,
        dust_threshold: if height >= l.dust_threshold_v2_height {
            l.dust_threshold_v2
        } else {
            l.dust_threshold
        },
        fusion_dust_threshold: if height >= l.fusion_dust_threshold_height_v2 {
            l.dust_threshold_v2
        } else {
            l.dust_threshold
        },
        minimum_fee: l.minimum_fee,
        fusion_tx_max_size: l.fusion_tx_max_size,
        fusion_tx_min_input_count: l.fusion_tx_min_input_count,
        fusion_tx_min_in_out_count_ratio: l.fusion_tx_min_in_out_count_ratio,
        normal_tx_max_output_ratio: (height >= l.normal_tx_max_output_ratio_v1_height)
            .then_some(l.normal_tx_max_output_ratio_v1),
        max_output_size_node: l.max_output_size_node,
        max_output_size_client: l.max_output_size_client,
        block_future_time_limit,
        timestamp_check_window,
    }
}
