//! Network consensus parameters consumed by the proof-of-work rules.
//!
//! Parameters are plain immutable values. Callers build them once, from
//! [`Network::params`] or a JSON override file, and pass them to every rule.

use std::fmt;
use std::str::FromStr;

use primitive_types::H256;
use serde::{Deserialize, Serialize};

use crate::arith::Target;
use crate::error::ConsensusError;

/// Proof-of-work parameters of one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Highest permitted target (lowest difficulty).
    pub pow_limit: Target,
    /// Seconds covered by one full retarget window.
    pub pow_target_timespan: i64,
    /// Design spacing between blocks, in seconds.
    pub pow_target_spacing: i64,
    /// Testnet relaxation flag, enforced outside the retargeting rules.
    pub pow_allow_min_difficulty_blocks: bool,
    /// Freeze the target at the tip's bits.
    pub pow_no_retargeting: bool,
}

impl ConsensusParams {
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.pow_limit.is_zero() {
            return Err(ConsensusError::InvalidParams("pow_limit must be nonzero"));
        }
        if self.pow_target_timespan <= 0 {
            return Err(ConsensusError::InvalidParams(
                "pow_target_timespan must be positive",
            ));
        }
        if self.pow_target_spacing <= 0 {
            return Err(ConsensusError::InvalidParams(
                "pow_target_spacing must be positive",
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON parameter document.
    pub fn from_json(json: &str) -> Result<Self, ConsensusError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Number of blocks in one retarget window.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }
}

/// Proof-of-work fields of a network's genesis header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisPow {
    /// Header hash in display order.
    pub hash: H256,
    pub bits: u32,
    pub time: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

const MAIN_POW_LIMIT: [u8; 32] = limit_bytes(2, 0x0f);
const REGTEST_POW_LIMIT: [u8; 32] = limit_bytes(0, 0x7f);

const MAIN_GENESIS_HASH: [u8; 32] = [
    0x00, 0x00, 0x05, 0x19, 0x58, 0x17, 0xcd, 0x43, 0xb0, 0x68, 0xee, 0x6d, 0xcd, 0x09, 0x11, 0x09,
    0xe9, 0x37, 0xb4, 0xb5, 0xc3, 0x22, 0xc6, 0xa2, 0xb2, 0x3a, 0x93, 0x91, 0x2e, 0x19, 0xbb, 0x76,
];

/// `leading_zero_bytes` zero bytes, then `first`, then 0xff to the end.
const fn limit_bytes(leading_zero_bytes: usize, first: u8) -> [u8; 32] {
    let mut bytes = [0xffu8; 32];
    let mut i = 0;
    while i < leading_zero_bytes {
        bytes[i] = 0;
        i += 1;
    }
    bytes[leading_zero_bytes] = first;
    bytes
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Main, Network::Test, Network::Regtest];

    pub fn params(self) -> ConsensusParams {
        match self {
            Network::Main => ConsensusParams {
                pow_limit: Target::from_be_bytes(MAIN_POW_LIMIT),
                pow_target_timespan: 4 * 60 * 60,
                pow_target_spacing: 79,
                pow_allow_min_difficulty_blocks: false,
                pow_no_retargeting: false,
            },
            Network::Test => ConsensusParams {
                pow_allow_min_difficulty_blocks: true,
                ..Network::Main.params()
            },
            Network::Regtest => ConsensusParams {
                pow_limit: Target::from_be_bytes(REGTEST_POW_LIMIT),
                pow_target_timespan: 30 * 60,
                pow_target_spacing: 30,
                pow_allow_min_difficulty_blocks: true,
                pow_no_retargeting: true,
            },
        }
    }

    pub fn genesis(self) -> GenesisPow {
        match self {
            Network::Main | Network::Test => GenesisPow {
                hash: H256::from(MAIN_GENESIS_HASH),
                bits: 0x1e0f_fff0,
                time: 1_471_801_377,
            },
            // Regtest mines its genesis at the limit; the hash is not pinned.
            Network::Regtest => GenesisPow {
                hash: H256::zero(),
                bits: 0x207f_ffff,
                time: 1_487_000_020,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(ConsensusError::UnknownNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployed_limits_encode_as_expected() {
        assert_eq!(Network::Main.params().pow_limit.to_compact(), 0x1e0f_ffff);
        assert_eq!(Network::Regtest.params().pow_limit.to_compact(), 0x207f_ffff);
        assert_eq!(
            Network::Main.params().pow_limit.to_string(),
            format!("00000{}", "f".repeat(59))
        );
    }

    #[test]
    fn testnet_differs_only_by_min_difficulty_flag() {
        let main = Network::Main.params();
        let test = Network::Test.params();
        assert!(test.pow_allow_min_difficulty_blocks);
        assert_eq!(
            ConsensusParams {
                pow_allow_min_difficulty_blocks: false,
                ..test
            },
            main
        );
    }

    #[test]
    fn all_networks_validate() {
        for network in Network::ALL {
            network.params().validate().expect("deployed params are valid");
            assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
        }
        assert_eq!(Network::Main.params().difficulty_adjustment_interval(), 182);
    }

    #[test]
    fn unknown_network_is_rejected() {
        let err = "signet".parse::<Network>().expect_err("unknown network");
        assert!(matches!(err, ConsensusError::UnknownNetwork(name) if name == "signet"));
    }

    #[test]
    fn json_round_trip_and_validation() {
        let params = Network::Regtest.params();
        let json = serde_json::to_string(&params).expect("serialize");
        assert_eq!(ConsensusParams::from_json(&json).expect("parse"), params);

        let broken = ConsensusParams {
            pow_target_spacing: 0,
            ..params
        };
        let json = serde_json::to_string(&broken).expect("serialize");
        assert!(matches!(
            ConsensusParams::from_json(&json),
            Err(ConsensusError::InvalidParams(_))
        ));
        assert!(matches!(
            ConsensusParams::from_json("{"),
            Err(ConsensusError::ParamsFile(_))
        ));
    }
}
