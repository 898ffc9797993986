//! Chain parameters: every operative consensus constant of one deployment.
//!
//! A [`ChainParams`] value is built once at startup, either from a network
//! preset or from a TOML file, validated, and then handed by reference to the
//! components that need it. Nothing reads these numbers from globals, so a test
//! network can supply its own schedule without recompiling.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::block::{Height, BLOCK_MAJOR_VERSION_1};
use crate::error::ConsensusError;
use crate::network::NetworkId;

/// Window/cut/lag triple driving the windowed retarget families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetargetWindow {
    /// Samples averaged per retarget.
    pub window: usize,
    /// Outliers trimmed from each end of the sorted window.
    pub cut: usize,
    /// Most recent samples ignored entirely.
    pub lag: usize,
}

impl RetargetWindow {
    pub const fn new(window: usize, cut: usize, lag: usize) -> Self {
        Self { window, cut, lag }
    }

    fn validate(&self, name: &str) -> Result<(), ConsensusError> {
        if self.window < 2 {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "{name}: window {} must be at least 2",
                self.window
            )));
        }
        if 2 * self.cut > self.window - 2 {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "{name}: cut {} leaves fewer than 2 samples of window {}",
                self.cut, self.window
            )));
        }
        Ok(())
    }
}

/// Tuning of one LWMA-2 revision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LwmaRevision {
    /// Solve times are clamped to `[1, max_solve_time_factor * target]`.
    pub max_solve_time_factor: u64,
    /// Lowest result allowed, in percent of the previous block's difficulty.
    pub swing_floor_pct: u64,
    /// Highest result allowed, in percent of the previous block's difficulty.
    pub swing_ceiling_pct: u64,
    /// Applied when the last three solve times sum below 80% of one target.
    pub sudden_drop_bump_pct: u64,
    /// `true` replaces the result with the bump, `false` only raises it to the bump.
    pub bump_overrides: bool,
}

/// Retarget algorithm selection and tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyParams {
    /// Target block interval in seconds.
    pub target_secs: u64,
    /// Selects the V2 window/cut/lag for the Zawy family instead of V1.
    pub zawy_use_v2: bool,
    pub zawy_block_index: Height,
    pub lwma2_block_index: Height,
    pub lwma2_block_index_v2: Height,
    pub lwma2_block_index_v3: Height,
    /// Solve times averaged by LWMA-2; it needs one more sample than this.
    pub lwma_window: usize,
    pub classic: RetargetWindow,
    pub zawy_v1: RetargetWindow,
    pub zawy_v2: RetargetWindow,
    pub lwma_v1: LwmaRevision,
    pub lwma_v2: LwmaRevision,
    pub lwma_v3: LwmaRevision,
}

impl DifficultyParams {
    /// The window/cut/lag triple the Zawy family runs with.
    pub fn zawy_window(&self) -> RetargetWindow {
        if self.zawy_use_v2 {
            self.zawy_v2
        } else {
            self.zawy_v1
        }
    }

    /// Samples LWMA-2 needs (`DIFFICULTY_BLOCKS_COUNT_V3`).
    pub fn lwma_blocks_count(&self) -> usize {
        self.lwma_window + 1
    }

    fn validate(&self) -> Result<(), ConsensusError> {
        if self.target_secs == 0 {
            return Err(ConsensusError::InvalidForkSchedule(
                "difficulty target must be positive".into(),
            ));
        }
        self.classic.validate("classic")?;
        self.zawy_v1.validate("zawy_v1")?;
        self.zawy_v2.validate("zawy_v2")?;
        if self.lwma_window < 3 {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "lwma window {} must be at least 3",
                self.lwma_window
            )));
        }
        let thresholds = [
            ("zawy", self.zawy_block_index),
            ("lwma2", self.lwma2_block_index),
            ("lwma2_v2", self.lwma2_block_index_v2),
            ("lwma2_v3", self.lwma2_block_index_v3),
        ];
        for pair in thresholds.windows(2) {
            if pair[0].1 >= pair[1].1 {
                return Err(ConsensusError::InvalidForkSchedule(format!(
                    "{} activation {} must precede {} activation {}",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }
        for (name, rev) in [
            ("lwma_v1", &self.lwma_v1),
            ("lwma_v2", &self.lwma_v2),
            ("lwma_v3", &self.lwma_v3),
        ] {
            if rev.max_solve_time_factor == 0 || rev.swing_floor_pct > rev.swing_ceiling_pct {
                return Err(ConsensusError::InvalidForkSchedule(format!(
                    "{name}: inconsistent revision bounds"
                )));
            }
            let max_solve_time = self.target_secs.checked_mul(rev.max_solve_time_factor);
            if max_solve_time.map_or(true, |t| t > MAX_SOLVE_TIME_SECS) {
                return Err(ConsensusError::InvalidForkSchedule(format!(
                    "{name}: max solve time {} x {}s exceeds {MAX_SOLVE_TIME_SECS}s",
                    rev.max_solve_time_factor, self.target_secs
                )));
            }
        }
        Ok(())
    }
}

/// One fixed-height major-version activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeHeight {
    pub major_version: u8,
    pub height: Height,
}

/// Fixed-height upgrades and the advisory software-fork table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeParams {
    /// Percent of the voting window that must vote for the next version.
    pub voting_threshold_pct: u8,
    /// Votes kept in the sliding window.
    pub voting_window: u64,
    /// Blocks before a scheduled upgrade during which miners signal readiness.
    pub upgrade_window: u64,
    /// Index into `fork_heights` this build supports.
    pub software_supported_fork_index: usize,
    /// Heights at which software forks are expected, strictly increasing.
    pub fork_heights: Vec<Height>,
    /// Major versions 2 and up with their activation heights.
    pub schedule: Vec<UpgradeHeight>,
}

impl UpgradeParams {
    /// The fork index this build supports; 0 when the fork table is empty.
    pub fn current_fork_index(&self) -> usize {
        if self.fork_heights.is_empty() {
            0
        } else {
            self.software_supported_fork_index
        }
    }

    /// Check the fixed-height schedule: versions 2, 3, ... in order with
    /// strictly increasing activation heights.
    pub fn validate_schedule(&self) -> Result<(), ConsensusError> {
        let mut expected_version = BLOCK_MAJOR_VERSION_1;
        let mut last_height: Option<Height> = None;
        for upgrade in &self.schedule {
            expected_version += 1;
            if upgrade.major_version != expected_version {
                return Err(ConsensusError::InvalidForkSchedule(format!(
                    "expected major version {expected_version}, found {}",
                    upgrade.major_version
                )));
            }
            if last_height.is_some_and(|prev| upgrade.height <= prev) {
                return Err(ConsensusError::InvalidForkSchedule(format!(
                    "activation height {} of version {} is not above the previous one",
                    upgrade.height, upgrade.major_version
                )));
            }
            last_height = Some(upgrade.height);
        }
        Ok(())
    }

    /// Check the software fork table and the supported index into it.
    pub fn validate_fork_table(&self) -> Result<(), ConsensusError> {
        if self.fork_heights.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConsensusError::InvalidForkSchedule(
                "software fork heights must be strictly increasing".into(),
            ));
        }
        if !self.fork_heights.is_empty()
            && self.software_supported_fork_index >= self.fork_heights.len()
        {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "supported fork index {} out of range of {} fork heights",
                self.software_supported_fork_index,
                self.fork_heights.len()
            )));
        }
        Ok(())
    }

    fn validate(&self, max_block_number: Height) -> Result<(), ConsensusError> {
        if self.voting_threshold_pct == 0 || self.voting_threshold_pct > 100 {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "voting threshold {}% must be in 1..=100",
                self.voting_threshold_pct
            )));
        }
        // One vote per block, so a longer window could never fill.
        if self.voting_window <= 1 || self.voting_window > max_block_number {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "voting window {} must be in 2..={max_block_number}",
                self.voting_window
            )));
        }
        self.validate_schedule()?;
        if let Some(upgrade) = self.schedule.iter().find(|u| u.height >= max_block_number) {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "activation height {} of version {} exceeds the maximum block number",
                upgrade.height, upgrade.major_version
            )));
        }
        self.validate_fork_table()
    }
}

/// Mixin bounds that activate at a height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinStage {
    pub height: Height,
    pub min: u64,
    pub max: u64,
    pub default: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinParams {
    /// Default mixin before the first stage; bounds are open until then.
    pub default_v0: u64,
    pub stages: Vec<MixinStage>,
}

/// Block, extra-field, fee and transaction-shape limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitParams {
    /// Exclusive upper bound on block heights.
    pub max_block_number: Height,
    pub max_block_size_initial: u64,
    pub max_block_size_growth_numerator: u64,
    pub max_block_size_growth_denominator: u64,
    pub max_extra_size: u64,
    pub max_extra_size_v2: u64,
    pub max_extra_size_v2_height: Height,
    pub minimum_fee: u64,
    pub dust_threshold: u64,
    pub dust_threshold_v2: u64,
    pub dust_threshold_v2_height: Height,
    pub fusion_dust_threshold_height_v2: Height,
    pub granted_full_reward_zone: u64,
    pub fusion_tx_max_size: u64,
    pub fusion_tx_min_input_count: u64,
    pub fusion_tx_min_in_out_count_ratio: u64,
    pub normal_tx_max_output_ratio_v1: u64,
    pub normal_tx_max_output_ratio_v1_height: Height,
    pub max_output_size_node: u64,
    pub max_output_size_client: u64,
}

/// Timestamp sanity rules that change with the retarget algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampParams {
    pub future_time_limit: u64,
    pub future_time_limit_v3: u64,
    pub future_time_limit_v4: u64,
    pub check_window: usize,
    pub check_window_v3: usize,
}

/// All consensus parameters of a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub network: NetworkId,
    pub difficulty: DifficultyParams,
    pub upgrades: UpgradeParams,
    pub mixin: MixinParams,
    pub limits: LimitParams,
    pub timestamps: TimestampParams,
}

const MAINNET_TARGET_SECS: u64 = 20;
const MAINNET_MAX_BLOCK_NUMBER: Height = 1_000_000_000;
const MAINNET_MONEY_SUPPLY: u64 = 10_000_000_000_000_000;
const MAINNET_FULL_REWARD_ZONE: u64 = 250_000;
/// Ceiling on `target_secs * max_solve_time_factor`, one day.
const MAX_SOLVE_TIME_SECS: u64 = 24 * 60 * 60;
const BLOCKS_PER_DAY: u64 = 24 * 60 * 60 / MAINNET_TARGET_SECS;

const LWMA_V1: LwmaRevision = LwmaRevision {
    max_solve_time_factor: 6,
    swing_floor_pct: 67,
    swing_ceiling_pct: 150,
    sudden_drop_bump_pct: 110,
    bump_overrides: true,
};

const LWMA_V2: LwmaRevision = LwmaRevision {
    max_solve_time_factor: 6,
    swing_floor_pct: 67,
    swing_ceiling_pct: 150,
    sudden_drop_bump_pct: 108,
    bump_overrides: false,
};

impl ChainParams {
    /// The live network.
    pub fn mainnet() -> Self {
        Self {
            network: NetworkId::Live,
            difficulty: DifficultyParams {
                target_secs: MAINNET_TARGET_SECS,
                zawy_use_v2: false,
                zawy_block_index: 1_000,
                lwma2_block_index: 100_000,
                lwma2_block_index_v2: 200_000,
                lwma2_block_index_v3: 500_000,
                lwma_window: 50,
                classic: RetargetWindow::new(15, 0, 0),
                zawy_v1: RetargetWindow::new(2_500, 60, 15),
                zawy_v2: RetargetWindow::new(2_500, 60, 10),
                lwma_v1: LWMA_V1,
                lwma_v2: LWMA_V2,
                lwma_v3: LWMA_V2,
            },
            upgrades: UpgradeParams {
                voting_threshold_pct: 90,
                voting_window: BLOCKS_PER_DAY,
                upgrade_window: BLOCKS_PER_DAY,
                software_supported_fork_index: 0,
                fork_heights: vec![
                    250_000, 500_000, 750_000, 1_000_000, 1_250_000, 1_500_000, 1_750_000,
                    2_000_000,
                ],
                schedule: vec![
                    UpgradeHeight { major_version: 2, height: 1 },
                    UpgradeHeight { major_version: 3, height: 2 },
                    UpgradeHeight { major_version: 4, height: 3 },
                    UpgradeHeight { major_version: 5, height: 4 },
                    UpgradeHeight { major_version: 6, height: MAINNET_MAX_BLOCK_NUMBER - 1 },
                ],
            },
            mixin: MixinParams {
                default_v0: 1,
                stages: vec![
                    MixinStage { height: 5, min: 0, max: 10, default: 1 },
                    MixinStage { height: 200_000, min: 0, max: 5, default: 3 },
                    MixinStage { height: 500_000, min: 2, max: 2, default: 2 },
                ],
            },
            limits: LimitParams {
                max_block_number: MAINNET_MAX_BLOCK_NUMBER,
                max_block_size_initial: 512_000,
                max_block_size_growth_numerator: 100 * 1024,
                max_block_size_growth_denominator: 365 * 24 * 60 * 60 / MAINNET_TARGET_SECS,
                max_extra_size: 2_048,
                max_extra_size_v2: 1_024,
                max_extra_size_v2_height: 300_000,
                minimum_fee: 1,
                dust_threshold: 100,
                dust_threshold_v2: 0,
                dust_threshold_v2_height: 200_000,
                fusion_dust_threshold_height_v2: 500_000,
                granted_full_reward_zone: MAINNET_FULL_REWARD_ZONE,
                fusion_tx_max_size: MAINNET_FULL_REWARD_ZONE * 30 / 100,
                fusion_tx_min_input_count: 12,
                fusion_tx_min_in_out_count_ratio: 4,
                normal_tx_max_output_ratio_v1: 10,
                normal_tx_max_output_ratio_v1_height: 350_000,
                max_output_size_node: MAINNET_MONEY_SUPPLY / 50_000,
                max_output_size_client: MAINNET_MONEY_SUPPLY / 100_000,
            },
            timestamps: TimestampParams {
                future_time_limit: 60 * 60 * 2,
                future_time_limit_v3: 3 * MAINNET_TARGET_SECS,
                future_time_limit_v4: 6 * MAINNET_TARGET_SECS,
                check_window: 60,
                check_window_v3: 11,
            },
        }
    }

    /// Public test network: mainnet algorithms on a compressed schedule.
    pub fn testnet() -> Self {
        let mut params = Self::mainnet();
        params.network = NetworkId::Test;
        params.difficulty.zawy_block_index = 100;
        params.difficulty.lwma2_block_index = 1_000;
        params.difficulty.lwma2_block_index_v2 = 2_000;
        params.difficulty.lwma2_block_index_v3 = 5_000;
        params.upgrades.voting_window = 60;
        params.upgrades.upgrade_window = 60;
        params.upgrades.fork_heights = vec![2_500, 5_000, 7_500, 10_000];
        params.upgrades.schedule[4].height = 10_000;
        params.mixin.stages[1].height = 2_000;
        params.mixin.stages[2].height = 5_000;
        params.limits.max_extra_size_v2_height = 3_000;
        params.limits.dust_threshold_v2_height = 2_000;
        params.limits.fusion_dust_threshold_height_v2 = 5_000;
        params.limits.normal_tx_max_output_ratio_v1_height = 3_500;
        params
    }

    /// Local development network: every rule change within the first hundred blocks.
    pub fn devnet() -> Self {
        let mut params = Self::testnet();
        params.network = NetworkId::Dev;
        params.difficulty.zawy_block_index = 10;
        params.difficulty.lwma2_block_index = 20;
        params.difficulty.lwma2_block_index_v2 = 30;
        params.difficulty.lwma2_block_index_v3 = 40;
        params.upgrades.voting_window = 10;
        params.upgrades.upgrade_window = 10;
        params.upgrades.fork_heights = vec![50, 100];
        params.upgrades.schedule[4].height = 5;
        params.mixin.stages[1].height = 30;
        params.mixin.stages[2].height = 40;
        params.limits.max_extra_size_v2_height = 35;
        params.limits.dust_threshold_v2_height = 30;
        params.limits.fusion_dust_threshold_height_v2 = 40;
        params.limits.normal_tx_max_output_ratio_v1_height = 35;
        params
    }

    /// The preset for a network.
    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Live => Self::mainnet(),
            NetworkId::Test => Self::testnet(),
            NetworkId::Dev => Self::devnet(),
        }
    }

    /// Check every structural invariant of the parameter set.
    ///
    /// A failure here is a broken deployment and is fatal at startup.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.limits.max_block_number == 0 {
            return Err(ConsensusError::InvalidForkSchedule(
                "max block number must be positive".into(),
            ));
        }
        if self.limits.max_block_size_growth_denominator == 0 {
            return Err(ConsensusError::InvalidForkSchedule(
                "block size growth denominator must be positive".into(),
            ));
        }
        self.difficulty.validate()?;
        self.upgrades.validate(self.limits.max_block_number)?;
        if self.mixin.stages.windows(2).any(|w| w[0].height >= w[1].height) {
            return Err(ConsensusError::InvalidForkSchedule(
                "mixin stage heights must be strictly increasing".into(),
            ));
        }
        if let Some(stage) = self.mixin.stages.iter().find(|s| s.min > s.max) {
            return Err(ConsensusError::InvalidForkSchedule(format!(
                "mixin stage at {} has min {} above max {}",
                stage.height, stage.min, stage.max
            )));
        }
        Ok(())
    }

    /// Load and validate parameters from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConsensusError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConsensusError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate parameters from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConsensusError> {
        let params: Self = toml::from_str(s).map_err(|e| ConsensusError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize the parameters to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConsensusError> {
        toml::to_string_pretty(self).map_err(|e| ConsensusError::Config(e.to_string()))
    }
}

/// Default is the live network.
impl Default for ChainParams {
    fn default() -> Self {
        Self::mainnet()
    }
}
