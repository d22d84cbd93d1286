//! Selection of the rule that governs the next block's target.
//!
//! The chain starts at the proof-of-work limit, switches to a fixed bootstrap
//! target at [`BOOTSTRAP_HEIGHT`] and retargets every block with the Kimoto
//! Gravity Well afterwards. The fixed-window rule in [`linear`] is kept for
//! the legacy entry point [`calculate_next_work_required`] only.

pub mod gravity_well;
pub mod linear;

use primitive_types::U256;
use tracing::debug;

use crate::arith::Target;
use crate::chain::ChainNode;
use crate::params::ConsensusParams;

pub use gravity_well::{WellReport, WellWindow, event_horizon_deviation};

/// Tip height whose successor is mined at [`bootstrap_target`].
pub const BOOTSTRAP_HEIGHT: u64 = 160;

/// Compact form of [`bootstrap_target`].
pub const BOOTSTRAP_BITS: u32 = 0x1d1f_ffff;

/// Design block spacing of the Gravity Well, in seconds.
pub const GRAVITY_WELL_SPACING: i64 = 79;

/// `~0 >> 27`: the fixed target handed out at the bootstrap height.
pub fn bootstrap_target() -> Target {
    Target::from_u256(U256::MAX >> 27usize)
}

impl WellWindow {
    /// Window of the deployed rule: 144 to 4032 blocks at 79 s spacing.
    pub fn deployed() -> Self {
        Self::from_spacing(GRAVITY_WELL_SPACING)
    }
}

/// Compact target required of the block following `tip`.
pub fn next_work_required<N: ChainNode>(tip: &N, params: &ConsensusParams) -> u32 {
    if tip.height() == BOOTSTRAP_HEIGHT {
        debug!(height = BOOTSTRAP_HEIGHT, "fixed bootstrap target");
        return BOOTSTRAP_BITS;
    }
    gravity_well::kimoto_gravity_well(Some(tip), &WellWindow::deployed(), params)
}

/// Legacy fixed-window retarget over a window that began at
/// `first_block_time`.
pub fn calculate_next_work_required<N: ChainNode>(
    tip: &N,
    first_block_time: i64,
    params: &ConsensusParams,
) -> u32 {
    linear::next_target(tip, first_block_time, params)
}
