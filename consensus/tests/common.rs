#![allow(dead_code)]
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use consensus::{ChainIndex, ChainNode, ConsensusParams, HeaderEntry, Target};

/// Classic Bitcoin retarget parameters: two-week window, `~0 >> 32` limit.
pub fn bitcoin_params() -> ConsensusParams {
    ConsensusParams {
        pow_limit: Target::from_hex(&format!("00000000{}", "f".repeat(56)))
            .expect("bitcoin pow limit"),
        pow_target_timespan: 14 * 24 * 60 * 60,
        pow_target_spacing: 10 * 60,
        pow_allow_min_difficulty_blocks: false,
        pow_no_retargeting: false,
    }
}

/// Chain from genesis to `tip_height` with per-height time and bits.
pub fn build_chain<T, B>(tip_height: u64, time_at: T, bits_at: B) -> ChainIndex
where
    T: Fn(u64) -> i64,
    B: Fn(u64) -> u32,
{
    let mut index = ChainIndex::new();
    for height in 0..=tip_height {
        index.append(time_at(height), bits_at(height));
    }
    index
}

/// History covering `first..=last` only; `first` has no predecessor.
pub fn build_partial_chain<T, B>(first: u64, last: u64, time_at: T, bits_at: B) -> ChainIndex
where
    T: Fn(u64) -> i64,
    B: Fn(u64) -> u32,
{
    ChainIndex::from_entries((first..=last).map(|height| HeaderEntry {
        height,
        time: time_at(height),
        bits: bits_at(height),
    }))
    .expect("contiguous history")
}

/// Single-node chain at an arbitrary height.
pub fn lone_tip(height: u64, time: i64, bits: u32) -> ChainIndex {
    build_partial_chain(height, height, |_| time, |_| bits)
}

/// Wraps a node and records the height of every node whose bits are read.
#[derive(Clone)]
pub struct Recording<N> {
    inner: N,
    sampled: Rc<RefCell<BTreeSet<u64>>>,
}

impl<N: ChainNode> Recording<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            sampled: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    pub fn sampled(&self) -> usize {
        self.sampled.borrow().len()
    }

    pub fn lowest_sampled(&self) -> Option<u64> {
        self.sampled.borrow().iter().next().copied()
    }
}

impl<N: ChainNode> ChainNode for Recording<N> {
    fn height(&self) -> u64 {
        self.inner.height()
    }

    fn time(&self) -> i64 {
        self.inner.time()
    }

    fn bits(&self) -> u32 {
        self.sampled.borrow_mut().insert(self.inner.height());
        self.inner.bits()
    }

    fn predecessor(&self) -> Option<Self> {
        self.inner.predecessor().map(|inner| Recording {
            inner,
            sampled: Rc::clone(&self.sampled),
        })
    }
}
