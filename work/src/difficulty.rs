//! Difficulty retargeting.
//!
//! Three families have been in force over the life of the chain, selected by
//! height:
//!
//! - **Classic**: sort the timestamps of a short window, trim `cut` from each
//!   end, divide the work done between the surviving endpoints by the time it
//!   took (rounded up).
//! - **Zawy**: the same averaging over a 2500-block window with a lag,
//!   rounded down.
//! - **LWMA-2**: linearly weighted moving average over the last 50 solve
//!   times, so recent blocks count most. Three parameter revisions.
//!
//! All arithmetic is integer. Intermediates are 128-bit so that every node
//! rounds identically.

use serde::{Deserialize, Serialize};

use redstone_types::{
    ConsensusError, Difficulty, DifficultyAlgorithm, DifficultyParams, DifficultySample, Height,
    LwmaRevision, RetargetWindow, RuleSet,
};

/// LWMA-2 scales its raw estimate by 99/100.
const LWMA_ADJUST_NUMERATOR: u128 = 99;
const LWMA_ADJUST_DENOMINATOR: u128 = 100;

/// Fewest samples a windowed average can work with.
const WINDOWED_MIN_SAMPLES: usize = 2;

/// Non-fatal anomaly observed while retargeting.
///
/// Hostile or misordered timestamps are expected input; the retarget clamps
/// and carries on rather than halting the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetargetWarning {
    /// The time span of the window was not positive and was clamped to one second.
    DegenerateTimestamps { height: Height, samples: usize },
}

/// Result of a retarget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retarget {
    pub algorithm: DifficultyAlgorithm,
    pub difficulty: Difficulty,
    pub warning: Option<RetargetWarning>,
}

#[derive(Clone, Copy, Debug)]
enum Rounding {
    Up,
    Down,
}

/// Computes the difficulty the next block must satisfy.
#[derive(Clone, Debug)]
pub struct DifficultyEngine {
    params: DifficultyParams,
}

impl DifficultyEngine {
    pub fn new(params: DifficultyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DifficultyParams {
        &self.params
    }

    /// The retarget algorithm in force at `height`.
    ///
    /// Each threshold is inclusive: the activation height itself already
    /// uses the new algorithm.
    pub fn algorithm_at(&self, height: Height) -> DifficultyAlgorithm {
        let p = &self.params;
        if height >= p.lwma2_block_index_v3 {
            DifficultyAlgorithm::Lwma2V3
        } else if height >= p.lwma2_block_index_v2 {
            DifficultyAlgorithm::Lwma2V2
        } else if height >= p.lwma2_block_index {
            DifficultyAlgorithm::Lwma2
        } else if height >= p.zawy_block_index {
            DifficultyAlgorithm::Zawy
        } else {
            DifficultyAlgorithm::Classic
        }
    }

    /// Window/cut/lag an algorithm runs with. LWMA-2 neither cuts nor lags.
    pub fn window_for(&self, algorithm: DifficultyAlgorithm) -> RetargetWindow {
        match algorithm {
            DifficultyAlgorithm::Classic => self.params.classic,
            DifficultyAlgorithm::Zawy => self.params.zawy_window(),
            DifficultyAlgorithm::Lwma2
            | DifficultyAlgorithm::Lwma2V2
            | DifficultyAlgorithm::Lwma2V3 => RetargetWindow::new(self.params.lwma_window, 0, 0),
        }
    }

    /// Fewest samples an algorithm accepts before failing with
    /// [`ConsensusError::InsufficientHistory`].
    pub fn required_samples(&self, algorithm: DifficultyAlgorithm) -> usize {
        if algorithm.is_lwma() {
            self.params.lwma_blocks_count()
        } else {
            WINDOWED_MIN_SAMPLES
        }
    }

    fn lwma_revision(&self, algorithm: DifficultyAlgorithm) -> &LwmaRevision {
        match algorithm {
            DifficultyAlgorithm::Lwma2V3 => &self.params.lwma_v3,
            DifficultyAlgorithm::Lwma2V2 => &self.params.lwma_v2,
            _ => &self.params.lwma_v1,
        }
    }

    /// Difficulty required of the block at `height`.
    ///
    /// `samples` is the contiguous run of accepted blocks ending right before
    /// `height`, oldest first. Extra older samples are ignored. The algorithm,
    /// target and window come from `rule_set`, which the caller resolved for
    /// the same height.
    pub fn next_difficulty(
        &self,
        height: Height,
        samples: &[DifficultySample],
        rule_set: &RuleSet,
    ) -> Result<Retarget, ConsensusError> {
        let algorithm = rule_set.difficulty_algorithm;
        let window = RetargetWindow::new(
            rule_set.difficulty_window,
            rule_set.difficulty_cut,
            rule_set.difficulty_lag,
        );
        tracing::debug!(
            height,
            algorithm = %algorithm,
            samples = samples.len(),
            "retargeting"
        );

        let (difficulty, degenerate) = match algorithm {
            DifficultyAlgorithm::Classic => {
                windowed_average(samples, window, rule_set.difficulty_target, Rounding::Up)?
            }
            DifficultyAlgorithm::Zawy => {
                windowed_average(samples, window, rule_set.difficulty_target, Rounding::Down)?
            }
            DifficultyAlgorithm::Lwma2
            | DifficultyAlgorithm::Lwma2V2
            | DifficultyAlgorithm::Lwma2V3 => lwma2(
                samples,
                window.window,
                rule_set.difficulty_target,
                self.lwma_revision(algorithm),
            )?,
        };

        let warning = degenerate.map(|samples| {
            tracing::warn!(
                height,
                algorithm = %algorithm,
                samples,
                "non-positive time span in retarget window, clamped to 1s"
            );
            RetargetWarning::DegenerateTimestamps { height, samples }
        });

        Ok(Retarget {
            algorithm,
            difficulty,
            warning,
        })
    }
}

/// Narrow a 128-bit intermediate to a difficulty, never below 1.
fn clamp_difficulty(value: u128) -> Difficulty {
    Difficulty::try_from(value).unwrap_or(Difficulty::MAX).max(1)
}

/// Sorted-timestamp window average shared by the Classic and Zawy families.
///
/// Returns the difficulty and, if the time span had to be clamped, the
/// number of samples in the window.
fn windowed_average(
    samples: &[DifficultySample],
    window: RetargetWindow,
    target: u64,
    rounding: Rounding,
) -> Result<(Difficulty, Option<usize>), ConsensusError> {
    if samples.len() < WINDOWED_MIN_SAMPLES {
        return Err(ConsensusError::InsufficientHistory {
            required: WINDOWED_MIN_SAMPLES,
            available: samples.len(),
        });
    }

    let window_len = window.window.max(WINDOWED_MIN_SAMPLES);
    let take = (window_len + window.lag).min(samples.len());
    let mut recent = &samples[samples.len() - take..];
    // The newest `lag` blocks only drop out once the window is full.
    if recent.len() > window_len {
        recent = &recent[..window_len];
    }
    let len = recent.len();

    let mut timestamps: Vec<u64> = recent.iter().map(|s| s.timestamp.as_secs()).collect();
    timestamps.sort_unstable();

    let kept = window_len
        .saturating_sub(2 * window.cut)
        .max(WINDOWED_MIN_SAMPLES);
    let (cut_begin, cut_end) = if len <= kept {
        (0, len)
    } else {
        let begin = (len - kept + 1) / 2;
        (begin, begin + kept)
    };

    let raw_span = timestamps[cut_end - 1] - timestamps[cut_begin];
    let (time_span, degenerate) = if raw_span == 0 {
        (1u128, Some(len))
    } else {
        (u128::from(raw_span), None)
    };

    let total_work = recent[cut_end - 1]
        .cumulative_difficulty
        .saturating_sub(recent[cut_begin].cumulative_difficulty);
    let next = match total_work.checked_mul(u128::from(target)) {
        Some(work) => match rounding {
            Rounding::Up => work.div_ceil(time_span),
            Rounding::Down => work / time_span,
        },
        None => u128::MAX,
    };

    Ok((clamp_difficulty(next), degenerate))
}

/// Linearly weighted moving average over the last `n` solve times.
fn lwma2(
    samples: &[DifficultySample],
    n: usize,
    target: u64,
    revision: &LwmaRevision,
) -> Result<(Difficulty, Option<usize>), ConsensusError> {
    let required = n + 1;
    if n < 3 || samples.len() < required {
        return Err(ConsensusError::InsufficientHistory {
            required: required.max(4),
            available: samples.len(),
        });
    }
    let recent = &samples[samples.len() - required..];

    let t = i128::from(target);
    let max_solve_time = t
        .saturating_mul(i128::from(revision.max_solve_time_factor))
        .max(1);

    let mut weighted: i128 = 0;
    let mut raw_weighted: i128 = 0;
    let mut last_three: i128 = 0;
    for i in 1..=n {
        let weight = i as i128;
        let solve_time = recent[i].timestamp.signed_delta(recent[i - 1].timestamp);
        raw_weighted = raw_weighted.saturating_add(solve_time.saturating_mul(weight));
        let solve_time = solve_time.clamp(1, max_solve_time);
        weighted = weighted.saturating_add(solve_time.saturating_mul(weight));
        if i + 3 > n {
            last_three = last_three.saturating_add(solve_time);
        }
    }

    let total_work = recent[n]
        .cumulative_difficulty
        .saturating_sub(recent[0].cumulative_difficulty);
    // next = work * T * (N + 1) * 99 / (100 * 2 * L); the (N + 1) / 2 turns
    // the weighted sum back into an average solve time.
    // Saturates rather than wraps on out-of-range targets.
    let scale = u128::from(target)
        .saturating_mul(n as u128 + 1)
        .saturating_mul(LWMA_ADJUST_NUMERATOR);
    let denominator = (LWMA_ADJUST_DENOMINATOR * 2).saturating_mul(weighted as u128);
    let mut next = total_work
        .checked_mul(scale)
        .map_or(u128::MAX, |v| v / denominator);

    let previous = recent[n]
        .cumulative_difficulty
        .saturating_sub(recent[n - 1].cumulative_difficulty);
    let floor = previous.saturating_mul(u128::from(revision.swing_floor_pct)) / 100;
    let ceiling = previous.saturating_mul(u128::from(revision.swing_ceiling_pct)) / 100;
    next = next.max(floor).min(ceiling);

    if last_three < t.saturating_mul(8) / 10 {
        let bump = previous.saturating_mul(u128::from(revision.sudden_drop_bump_pct)) / 100;
        next = if revision.bump_overrides {
            bump
        } else {
            next.max(bump)
        };
    }

    let degenerate = (raw_weighted <= 0).then_some(required);
    Ok((clamp_difficulty(next), degenerate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use redstone_types::ChainParams;

    const T: u64 = 20;

    fn engine() -> DifficultyEngine {
        DifficultyEngine::new(ChainParams::mainnet().difficulty)
    }

    fn rule_set_for(engine: &DifficultyEngine, height: Height) -> RuleSet {
        let algorithm = engine.algorithm_at(height);
        let window = engine.window_for(algorithm);
        RuleSet {
            activation_height: 0,
            major_version: 5,
            minor_version_default: 0,
            difficulty_algorithm: algorithm,
            difficulty_target: T,
            difficulty_window: window.window,
            difficulty_cut: window.cut,
            difficulty_lag: window.lag,
            min_mixin: 0,
            max_mixin: 10,
            default_mixin: 1,
            max_block_size_initial: 512_000,
            max_block_size_growth_numerator: 102_400,
            max_block_size_growth_denominator: 1_576_800,
            max_extra_size: 2_048,
            granted_full_reward_zone: 250_000,
            dust_threshold: 100,
            fusion_dust_threshold: 100,
            minimum_fee: 1,
            fusion_tx_max_size: 75_000,
            fusion_tx_min_input_count: 12,
            fusion_tx_min_in_out_count_ratio: 4,
            normal_tx_max_output_ratio: None,
            max_output_size_node: 1,
            max_output_size_client: 1,
            block_future_time_limit: 7_200,
            timestamp_check_window: 60,
        }
    }

    /// `count` samples `spacing` seconds apart, each adding `difficulty`.
    fn steady(count: usize, spacing: u64, difficulty: u128) -> Vec<DifficultySample> {
        (0..count)
            .map(|i| {
                DifficultySample::new(1_600_000_000 + i as u64 * spacing, (i as u128 + 1) * difficulty)
            })
            .collect()
    }

    #[test]
    fn selection_boundaries_are_inclusive() {
        let e = engine();
        assert_eq!(e.algorithm_at(0), DifficultyAlgorithm::Classic);
        assert_eq!(e.algorithm_at(999), DifficultyAlgorithm::Classic);
        assert_eq!(e.algorithm_at(1_000), DifficultyAlgorithm::Zawy);
        assert_eq!(e.algorithm_at(99_999), DifficultyAlgorithm::Zawy);
        assert_eq!(e.algorithm_at(100_000), DifficultyAlgorithm::Lwma2);
        assert_eq!(e.algorithm_at(200_000), DifficultyAlgorithm::Lwma2V2);
        assert_eq!(e.algorithm_at(499_999), DifficultyAlgorithm::Lwma2V2);
        assert_eq!(e.algorithm_at(500_000), DifficultyAlgorithm::Lwma2V3);
    }

    #[test]
    fn required_samples_per_family() {
        let e = engine();
        assert_eq!(e.required_samples(DifficultyAlgorithm::Classic), 2);
        assert_eq!(e.required_samples(DifficultyAlgorithm::Zawy), 2);
        assert_eq!(e.required_samples(DifficultyAlgorithm::Lwma2), 51);
    }

    #[test]
    fn classic_is_exact_on_steady_chain() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        let r = e.next_difficulty(500, &steady(15, T, 5_000), &rs).unwrap();
        assert_eq!(r.difficulty, 5_000);
        assert_eq!(r.algorithm, DifficultyAlgorithm::Classic);
        assert!(r.warning.is_none());
    }

    #[test]
    fn classic_doubles_when_blocks_twice_as_fast() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        let r = e.next_difficulty(500, &steady(15, T / 2, 5_000), &rs).unwrap();
        assert_eq!(r.difficulty, 10_000);
    }

    #[test]
    fn classic_rounds_up() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        // work 1 over 3 seconds at target 20 -> 20 / 3 = 6.67 -> 7
        let samples = vec![DifficultySample::new(100, 10), DifficultySample::new(103, 11)];
        let r = e.next_difficulty(500, &samples, &rs).unwrap();
        assert_eq!(r.difficulty, 7);
    }

    #[test]
    fn classic_uses_only_last_window() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        // Old history at a very different pace must be ignored.
        let mut samples = steady(30, 1, 1);
        let last = *samples.last().unwrap();
        for i in 1..=15u64 {
            samples.push(DifficultySample::new(
                last.timestamp.as_secs() + i * T,
                last.cumulative_difficulty + u128::from(i) * 4_000,
            ));
        }
        let r = e.next_difficulty(500, &samples, &rs).unwrap();
        assert_eq!(r.difficulty, 4_000);
    }

    #[test]
    fn single_sample_is_insufficient() {
        let e = engine();
        let rs = rule_set_for(&e, 0);
        let err = e
            .next_difficulty(0, &[DifficultySample::new(0, 1)], &rs)
            .unwrap_err();
        assert_eq!(
            err,
            ConsensusError::InsufficientHistory {
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn identical_timestamps_warn_and_clamp() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        let samples: Vec<_> = (0..10u128)
            .map(|i| DifficultySample::new(1_000, (i + 1) * 100))
            .collect();
        let r = e.next_difficulty(500, &samples, &rs).unwrap();
        // 900 work * 20 / 1s
        assert_eq!(r.difficulty, 18_000);
        assert_eq!(
            r.warning,
            Some(RetargetWarning::DegenerateTimestamps {
                height: 500,
                samples: 10
            })
        );
    }

    #[test]
    fn zawy_is_exact_on_steady_chain() {
        let e = engine();
        let rs = rule_set_for(&e, 5_000);
        assert_eq!(rs.difficulty_window, 2_500);
        let r = e.next_difficulty(5_000, &steady(2_515, T, 70_000), &rs).unwrap();
        assert_eq!(r.algorithm, DifficultyAlgorithm::Zawy);
        assert_eq!(r.difficulty, 70_000);
    }

    #[test]
    fn zawy_ignores_lagged_blocks() {
        let e = engine();
        let rs = rule_set_for(&e, 5_000);
        let mut samples = steady(2_500, T, 70_000);
        let last = *samples.last().unwrap();
        // Fifteen instant, enormous blocks fall inside the lag and change nothing.
        for i in 1..=15u128 {
            samples.push(DifficultySample::new(
                last.timestamp.as_secs(),
                last.cumulative_difficulty + i * 1_000_000_000,
            ));
        }
        let r = e.next_difficulty(5_000, &samples, &rs).unwrap();
        assert_eq!(r.difficulty, 70_000);
    }

    #[test]
    fn zawy_works_on_short_history() {
        let e = engine();
        let rs = rule_set_for(&e, 1_200);
        let r = e.next_difficulty(1_200, &steady(1_200, T, 9_000), &rs).unwrap();
        assert_eq!(r.difficulty, 9_000);
    }

    #[test]
    fn lwma_is_stable_within_one_percent() {
        let e = engine();
        for height in [100_000, 200_000, 500_000] {
            let rs = rule_set_for(&e, height);
            let r = e.next_difficulty(height, &steady(51, T, 1_000_000), &rs).unwrap();
            assert_eq!(r.difficulty, 990_000, "height {height}");
        }
    }

    #[test]
    fn lwma_needs_window_plus_one() {
        let e = engine();
        let rs = rule_set_for(&e, 100_000);
        let err = e
            .next_difficulty(100_000, &steady(50, T, 1_000), &rs)
            .unwrap_err();
        assert_eq!(
            err,
            ConsensusError::InsufficientHistory {
                required: 51,
                available: 50
            }
        );
    }

    #[test]
    fn lwma_swing_is_bounded() {
        let e = engine();
        let rs = rule_set_for(&e, 200_000);
        // Very slow blocks: capped at 6T each, result floored at 67% of previous.
        let slow = steady(51, 100 * T, 1_000_000);
        let r = e.next_difficulty(200_000, &slow, &rs).unwrap();
        assert_eq!(r.difficulty, 670_000);

        // Very fast blocks: result capped at 150% of previous.
        let mut fast = steady(48, 1, 1_000_000);
        let last = *fast.last().unwrap();
        for i in 1..=3u64 {
            fast.push(DifficultySample::new(
                last.timestamp.as_secs() + i * T,
                last.cumulative_difficulty + u128::from(i) * 1_000_000,
            ));
        }
        let r = e.next_difficulty(200_000, &fast, &rs).unwrap();
        assert_eq!(r.difficulty, 1_500_000);
    }

    #[test]
    fn sudden_drop_rule_differs_between_revisions() {
        let e = engine();
        // Last three solves take one second each; the rest are on target.
        let mut samples = steady(48, T, 1_000_000);
        let last = *samples.last().unwrap();
        for i in 1..=3u64 {
            samples.push(DifficultySample::new(
                last.timestamp.as_secs() + i,
                last.cumulative_difficulty + u128::from(i) * 1_000_000,
            ));
        }

        let v1 = e
            .next_difficulty(100_000, &samples, &rule_set_for(&e, 100_000))
            .unwrap();
        assert_eq!(v1.difficulty, 1_100_000);

        let v2 = e
            .next_difficulty(200_000, &samples, &rule_set_for(&e, 200_000))
            .unwrap();
        assert!(v2.difficulty >= 1_080_000);
        assert!(v2.difficulty <= 1_500_000);
    }

    #[test]
    fn lwma_backwards_timestamps_never_divide_by_zero() {
        let e = engine();
        let rs = rule_set_for(&e, 300_000);
        let samples: Vec<_> = (0..51u64)
            .map(|i| DifficultySample::new(2_000_000 - i * 10, u128::from(i + 1) * 500))
            .collect();
        let r = e.next_difficulty(300_000, &samples, &rs).unwrap();
        assert!(r.difficulty >= 1);
        assert!(matches!(
            r.warning,
            Some(RetargetWarning::DegenerateTimestamps { samples: 51, .. })
        ));
    }

    #[test]
    fn difficulty_never_zero_on_flat_cumulative() {
        let e = engine();
        for height in [10, 5_000, 150_000] {
            let rs = rule_set_for(&e, height);
            let samples: Vec<_> = (0..60u64)
                .map(|i| DifficultySample::new(i * T, 7))
                .collect();
            let r = e.next_difficulty(height, &samples, &rs).unwrap();
            assert_eq!(r.difficulty, 1, "height {height}");
        }
    }

    #[test]
    fn huge_cumulative_difficulty_saturates() {
        let e = engine();
        let rs = rule_set_for(&e, 500);
        let samples = vec![
            DifficultySample::new(0, 0),
            DifficultySample::new(1, u128::MAX / 2),
        ];
        let r = e.next_difficulty(500, &samples, &rs).unwrap();
        assert_eq!(r.difficulty, Difficulty::MAX);
    }

    #[test]
    fn lwma_saturates_on_extreme_target() {
        let e = engine();
        for height in [150_000, 300_000, 600_000] {
            let mut rs = rule_set_for(&e, height);
            rs.difficulty_target = u64::MAX;
            let r = e.next_difficulty(height, &steady(60, T, 1_000), &rs).unwrap();
            assert!(r.difficulty >= 1, "height {height}");
        }
    }
}
