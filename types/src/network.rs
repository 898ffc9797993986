//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConsensusError;

/// Identifies which Redstones network a parameter set belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// The production network.
    Live,
    /// The public test network.
    Test,
    /// Local development network.
    Dev,
}

impl NetworkId {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Test => "test",
            Self::Dev => "dev",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" | "mainnet" => Ok(Self::Live),
            "test" | "testnet" => Ok(Self::Test),
            "dev" | "devnet" => Ok(Self::Dev),
            other => Err(ConsensusError::Config(format!("unknown network '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("live".parse::<NetworkId>().unwrap(), NetworkId::Live);
        assert_eq!("TestNet".parse::<NetworkId>().unwrap(), NetworkId::Test);
        assert_eq!("dev".parse::<NetworkId>().unwrap(), NetworkId::Dev);
    }

    #[test]
    fn unknown_name_is_config_error() {
        let err = "regtest".parse::<NetworkId>().unwrap_err();
        assert!(matches!(err, ConsensusError::Config(_)));
    }
}
