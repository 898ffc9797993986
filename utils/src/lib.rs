//! Shared utilities for the Redstones consensus tools.

pub mod logging;

pub use logging::{init_logging, LogFormat};
