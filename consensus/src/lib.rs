//! Consensus rule resolution.
//!
//! Given a block height, decides which rules govern that block:
//! - [`FixedForkSchedule`]: consensus-binding major-version activation by height.
//! - [`SoftwareForkTracker`]: advisory tracking of version votes and the
//!   software fork index, used only to warn operators.
//! - [`RuleTable`]: the full parameter set in force at each height.
//! - [`ConsensusResolver`]: composes the above with the hash dispatcher and
//!   difficulty engine from `redstone-work`.
//!
//! Every type here is immutable once built and performs no I/O.

pub mod fork_schedule;
pub mod resolver;
pub mod rule_table;
pub mod software_fork;

pub use fork_schedule::FixedForkSchedule;
pub use resolver::{ConsensusResolver, Resolution, UpgradeAdvisory};
pub use rule_table::RuleTable;
pub use software_fork::{SoftwareForkTracker, VoteTally, VoteWindow};
