//! Fixed-window retargeting: scale the tip's target by the observed window
//! duration, bounded to a factor of four either way.

use tracing::warn;

use crate::arith::Target;
use crate::chain::ChainNode;
use crate::params::ConsensusParams;

/// Observed window duration bounded to `[timespan / 4, timespan * 4]`.
///
/// The timespan must be positive, which [`ConsensusParams::validate`]
/// guarantees.
pub fn bounded_timespan(actual: i64, params: &ConsensusParams) -> i64 {
    let timespan = params.pow_target_timespan;
    actual.clamp(timespan / 4, timespan.saturating_mul(4))
}

/// Next compact target after a window that began at `first_block_time` and
/// ended at `tip`.
pub fn next_target<N: ChainNode>(tip: &N, first_block_time: i64, params: &ConsensusParams) -> u32 {
    if params.pow_no_retargeting {
        return tip.bits();
    }
    if params.pow_target_timespan <= 0 {
        warn!(
            timespan = params.pow_target_timespan,
            "non-positive retarget timespan, keeping tip bits"
        );
        return tip.bits();
    }

    let actual = bounded_timespan(tip.time().saturating_sub(first_block_time), params);

    let target = Target::from_compact(tip.bits())
        .target
        .mul_div_u64(actual as u64, params.pow_target_timespan as u64);

    target.min(params.pow_limit).to_compact()
}
