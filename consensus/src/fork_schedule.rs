//! Fixed-height major-version activation.
//!
//! This schedule is consensus-binding: a block whose major version differs
//! from [`FixedForkSchedule::version_at`] for its height is invalid. It is a
//! separate type from the advisory [`SoftwareForkTracker`] so that a
//! software-upgrade warning can never feed into validation.
//!
//! [`SoftwareForkTracker`]: crate::SoftwareForkTracker

use redstone_types::block::{BLOCK_MAJOR_VERSION_1, BLOCK_MINOR_VERSION_0, BLOCK_MINOR_VERSION_1};
use redstone_types::{
    ConsensusError, Height, MajorVersion, MinorVersion, UpgradeHeight, UpgradeParams,
};

/// Height-ordered major-version activations, version 1 at genesis.
#[derive(Clone, Debug)]
pub struct FixedForkSchedule {
    activations: Vec<UpgradeHeight>,
    upgrade_window: u64,
}

impl FixedForkSchedule {
    /// Build the schedule, rejecting activation heights that do not strictly
    /// increase or versions that skip a number.
    pub fn new(upgrades: &UpgradeParams) -> Result<Self, ConsensusError> {
        upgrades.validate_schedule()?;

        let mut activations = Vec::with_capacity(upgrades.schedule.len() + 1);
        // Version 2 may activate at genesis, in which case version 1 never runs.
        if upgrades.schedule.first().map_or(true, |first| first.height > 0) {
            activations.push(UpgradeHeight {
                major_version: BLOCK_MAJOR_VERSION_1,
                height: 0,
            });
        }
        activations.extend_from_slice(&upgrades.schedule);

        Ok(Self {
            activations,
            upgrade_window: upgrades.upgrade_window,
        })
    }

    /// Highest major version whose activation height is at or below `height`.
    pub fn version_at(&self, height: Height) -> MajorVersion {
        let idx = self.activations.partition_point(|a| a.height <= height);
        self.activations
            .get(idx.saturating_sub(1))
            .map_or(BLOCK_MAJOR_VERSION_1, |a| a.major_version)
    }

    /// Default minor version for a block at `height`.
    ///
    /// Miners signal readiness with minor version 1 during the
    /// `upgrade_window` blocks leading up to a scheduled activation.
    pub fn minor_version_at(&self, height: Height) -> MinorVersion {
        match self.next_upgrade_after(height) {
            Some(next) if next.height - height <= self.upgrade_window => BLOCK_MINOR_VERSION_1,
            _ => BLOCK_MINOR_VERSION_0,
        }
    }

    /// Height at which `major_version` activates, if it is scheduled.
    pub fn activation_height(&self, major_version: MajorVersion) -> Option<Height> {
        self.activations
            .iter()
            .find(|a| a.major_version == major_version)
            .map(|a| a.height)
    }

    /// First activation strictly above `height`.
    pub fn next_upgrade_after(&self, height: Height) -> Option<UpgradeHeight> {
        let idx = self.activations.partition_point(|a| a.height <= height);
        self.activations.get(idx).copied()
    }

    /// Activation heights, genesis first.
    pub fn activation_heights(&self) -> impl Iterator<Item = Height> + '_ {
        self.activations.iter().map(|a| a.height)
    }

    /// The last scheduled major version.
    pub fn latest_version(&self) -> MajorVersion {
        self.activations
            .last()
            .map_or(BLOCK_MAJOR_VERSION_1, |a| a.major_version)
    }
}
