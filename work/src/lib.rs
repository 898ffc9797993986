//! Proof-of-work side of consensus.
//!
//! Three pieces, all pure:
//! - [`HashDispatcher`] maps a block major version to the slow-hash function it must use.
//! - [`DifficultyEngine`] computes the difficulty the next block has to meet.
//! - [`check_hash`] decides whether a hash satisfies a difficulty.
//!
//! The slow-hash implementations themselves live outside this crate.

pub mod difficulty;
pub mod dispatch;
pub mod validator;

pub use difficulty::{DifficultyEngine, Retarget, RetargetWarning};
pub use dispatch::HashDispatcher;
pub use validator::check_hash;
