pub mod arith;
pub mod chain;
pub mod error;
pub mod params;
pub mod pow;
pub mod retarget;

pub use arith::{DecodedCompact, Target};
pub use chain::{BlockRef, ChainIndex, ChainNode, HeaderEntry, NodeId};
pub use error::ConsensusError;
pub use params::{ConsensusParams, GenesisPow, Network};
pub use pow::check_proof_of_work;
pub use primitive_types::{H256, U256};
pub use retarget::{
    BOOTSTRAP_BITS, BOOTSTRAP_HEIGHT, GRAVITY_WELL_SPACING, WellReport, WellWindow,
    bootstrap_target, calculate_next_work_required, event_horizon_deviation, next_work_required,
};
