//! Kimoto Gravity Well retargeting.
//!
//! Every block, walk back from the tip keeping a running mean of the sampled
//! targets. After each sample compare the observed block rate against the
//! design rate; once the window holds `min_window` samples, stop as soon as
//! the rate ratio leaves the "event horizon" envelope
//!
//! ```text
//! deviation = 1 + 0.7084 * (mass / 28.2)^-1.228
//! slow      = 1 / deviation
//! fast      = deviation
//! ```
//!
//! which narrows as the window grows. The averaged target is then scaled by
//! actual / expected seconds of the final window.
//!
//! All floating-point work uses IEEE-754 `f64` in exactly the order above;
//! the results are consensus critical.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::arith::Target;
use crate::chain::ChainNode;
use crate::params::ConsensusParams;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
const HORIZON_SCALE: f64 = 0.7084;
const HORIZON_MASS: f64 = 28.2;
const HORIZON_EXPONENT: f64 = -1.228;

/// Window bounds and design spacing of a Gravity Well walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellWindow {
    /// Design seconds between blocks.
    pub spacing: i64,
    /// Samples required before the early-exit test applies.
    pub min_window: u64,
    /// Hard cap on samples; zero means unbounded.
    pub max_window: u64,
}

impl WellWindow {
    /// Window derived from a block spacing: between a tenth of a day and 2.8
    /// days, each scaled by `spacing / 60`, expressed in blocks.
    pub fn from_spacing(spacing: i64) -> Self {
        let day = f64::from(SECONDS_PER_DAY);
        let min_seconds = (day * (spacing as f64 / 60.0) * 0.1) as i64;
        let max_seconds = (day * (spacing as f64 / 60.0) * 2.8) as i64;
        Self {
            spacing,
            min_window: (min_seconds / spacing) as u64,
            max_window: (max_seconds / spacing) as u64,
        }
    }
}

/// Width of the event horizon for a window holding `mass` samples.
pub fn event_horizon_deviation(mass: u64) -> f64 {
    1.0 + (HORIZON_SCALE * (mass as f64 / HORIZON_MASS).powf(HORIZON_EXPONENT))
}

/// Summary of one Gravity Well evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellReport {
    pub bits: u32,
    /// Blocks sampled by the walk.
    pub samples: u64,
    /// Expected over observed seconds of the final window.
    pub adjustment_ratio: f64,
    pub actual_seconds: i64,
    pub target_seconds: i64,
    /// The walk left the envelope instead of running out of history.
    pub early_exit: bool,
    /// Limit returned because the history is too short.
    pub bootstrap: bool,
}

impl WellReport {
    fn bootstrap(params: &ConsensusParams) -> Self {
        Self {
            bits: params.pow_limit.to_compact(),
            samples: 0,
            adjustment_ratio: 1.0,
            actual_seconds: 0,
            target_seconds: 0,
            early_exit: false,
            bootstrap: true,
        }
    }
}

/// Next compact target per the Gravity Well.
pub fn kimoto_gravity_well<N: ChainNode>(
    tip: Option<&N>,
    window: &WellWindow,
    params: &ConsensusParams,
) -> u32 {
    gravity_well_report(tip, window, params).bits
}

/// Runs the Gravity Well walk and reports how it ended.
pub fn gravity_well_report<N: ChainNode>(
    tip: Option<&N>,
    window: &WellWindow,
    params: &ConsensusParams,
) -> WellReport {
    let tip = match tip {
        Some(tip) if tip.height() != 0 && tip.height() >= window.min_window => tip,
        _ => {
            debug!(min_window = window.min_window, "gravity well bootstrap at pow limit");
            return WellReport::bootstrap(params);
        }
    };

    let mut mass: u64 = 0;
    let mut actual_seconds: i64 = 0;
    let mut target_seconds: i64 = 0;
    let mut adjustment_ratio = 1.0f64;
    let mut average = Target::from_compact(tip.bits()).target;
    let mut previous_average = average;
    let mut early_exit = false;

    let mut cursor = Some(tip.clone());
    let mut i: u64 = 1;
    while let Some(reading) = cursor.take() {
        if reading.height() == 0 {
            break;
        }
        if window.max_window > 0 && i > window.max_window {
            break;
        }
        mass += 1;

        let sampled = Target::from_compact(reading.bits()).target;
        if i == 1 {
            average = sampled;
        } else if sampled >= previous_average {
            average = (sampled - previous_average) / i + previous_average;
        } else {
            average = previous_average - (previous_average - sampled) / i;
        }
        previous_average = average;

        actual_seconds = tip.time().saturating_sub(reading.time()).max(0);
        target_seconds = window.spacing.saturating_mul(mass as i64);
        adjustment_ratio = 1.0;
        if actual_seconds != 0 && target_seconds != 0 {
            adjustment_ratio = target_seconds as f64 / actual_seconds as f64;
        }

        let deviation = event_horizon_deviation(mass);
        let fast = deviation;
        let slow = 1.0 / deviation;
        if mass >= window.min_window && (adjustment_ratio <= slow || adjustment_ratio >= fast) {
            early_exit = true;
            break;
        }

        cursor = reading.predecessor();
        i += 1;
    }

    let mut target = average;
    if actual_seconds > 0 && target_seconds > 0 {
        target = target.mul_div_u64(actual_seconds as u64, target_seconds as u64);
    }
    if target > params.pow_limit {
        target = params.pow_limit;
    }

    let bits = target.to_compact();
    trace!(
        height = tip.height(),
        samples = mass,
        adjustment_ratio,
        actual_seconds,
        target_seconds,
        early_exit,
        bits,
        "gravity well retarget"
    );

    WellReport {
        bits,
        samples: mass,
        adjustment_ratio,
        actual_seconds,
        target_seconds,
        early_exit,
        bootstrap: false,
    }
}
