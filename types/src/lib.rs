//! Fundamental types for the Redstones consensus core.
//!
//! This crate defines the values shared by every other crate in the workspace:
//! heights and block versions, difficulty samples, proof-of-work hash identifiers,
//! the per-height rule set, and the static [`ChainParams`] a deployment is built from.

pub mod block;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod network;
pub mod params;
pub mod rules;
pub mod time;

pub use block::{BlockVersionVote, Height, MajorVersion, MinorVersion};
pub use difficulty::{CumulativeDifficulty, Difficulty, DifficultyAlgorithm, DifficultySample};
pub use error::ConsensusError;
pub use hash::{HashAlgorithmId, PowHash};
pub use network::NetworkId;
pub use params::{
    ChainParams, DifficultyParams, LimitParams, LwmaRevision, MixinParams, MixinStage,
    RetargetWindow, TimestampParams, UpgradeHeight, UpgradeParams,
};
pub use rules::RuleSet;
pub use time::Timestamp;
