use thiserror::Error;

/// Errors raised while preparing inputs for the proof-of-work rules.
///
/// The rules themselves never fail: a block that does not meet its target is
/// a `false` from [`crate::check_proof_of_work`], not an error.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid length: expected at most {expected} hex digits, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
    #[error("invalid consensus parameters: {0}")]
    InvalidParams(&'static str),
    #[error("parameter file error: {0}")]
    ParamsFile(#[from] serde_json::Error),
    #[error("unknown chain node {0}")]
    UnknownNode(usize),
    #[error("chain structure violation: {0}")]
    ChainStructure(String),
}
