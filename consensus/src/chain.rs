//! Read-only view of chain history used by the retargeting rules.
//!
//! The rules only need four things from a historical block: its height, its
//! timestamp, its compact target and a way to reach its predecessor. Any
//! block index can provide them through [`ChainNode`]; [`ChainIndex`] is an
//! arena implementation where nodes are addressed by stable [`NodeId`]s and
//! forks share their common ancestors.

use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;

/// A historical block as seen by the retargeting rules.
///
/// Implementations hand out cheap handles; the history behind a handle must
/// stay valid and unchanged for as long as the handle is alive.
pub trait ChainNode: Clone {
    fn height(&self) -> u64;
    /// Block timestamp in seconds.
    fn time(&self) -> i64;
    /// Compact target claimed by the block.
    fn bits(&self) -> u32;
    /// The previous block, absent at genesis or at the root of a partial
    /// history.
    fn predecessor(&self) -> Option<Self>;
}

/// Header fields stored per node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub height: u64,
    pub time: i64,
    pub bits: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Slot {
    header: HeaderEntry,
    prev: Option<NodeId>,
}

/// Append-only arena of block headers linked to their predecessors.
#[derive(Clone, Debug, Default)]
pub struct ChainIndex {
    slots: Vec<Slot>,
    tip: Option<NodeId>,
}

impl ChainIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a linear history from consecutive headers. The first entry
    /// becomes a root without predecessor, so a history may start above
    /// genesis.
    pub fn from_entries<I>(entries: I) -> Result<Self, ConsensusError>
    where
        I: IntoIterator<Item = HeaderEntry>,
    {
        let mut index = Self::new();
        let mut prev: Option<NodeId> = None;
        for entry in entries {
            let id = match prev {
                None => index.insert_root(entry),
                Some(parent) => {
                    let expected = index.header(parent)?.height + 1;
                    if entry.height != expected {
                        return Err(ConsensusError::ChainStructure(format!(
                            "expected height {expected}, found {}",
                            entry.height
                        )));
                    }
                    index.insert_child(parent, entry.time, entry.bits)?
                }
            };
            prev = Some(id);
        }
        Ok(index)
    }

    /// Inserts a node with no known predecessor and makes it the tip if it
    /// is higher than the current one.
    pub fn insert_root(&mut self, header: HeaderEntry) -> NodeId {
        self.push(Slot { header, prev: None })
    }

    /// Inserts a child of `parent` one height above it.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        time: i64,
        bits: u32,
    ) -> Result<NodeId, ConsensusError> {
        let height = self.header(parent)?.height + 1;
        Ok(self.push(Slot {
            header: HeaderEntry { height, time, bits },
            prev: Some(parent),
        }))
    }

    /// Extends the current tip, starting a genesis node when empty.
    pub fn append(&mut self, time: i64, bits: u32) -> NodeId {
        match self.tip {
            Some(tip) => {
                let height = self.slots[tip.0].header.height + 1;
                self.push(Slot {
                    header: HeaderEntry { height, time, bits },
                    prev: Some(tip),
                })
            }
            None => self.insert_root(HeaderEntry {
                height: 0,
                time,
                bits,
            }),
        }
    }

    fn push(&mut self, slot: Slot) -> NodeId {
        let id = NodeId(self.slots.len());
        let height = slot.header.height;
        self.slots.push(slot);
        let higher = self
            .tip
            .map_or(true, |tip| height > self.slots[tip.0].header.height);
        if higher {
            self.tip = Some(id);
        }
        id
    }

    pub fn header(&self, id: NodeId) -> Result<&HeaderEntry, ConsensusError> {
        self.slots
            .get(id.0)
            .map(|slot| &slot.header)
            .ok_or(ConsensusError::UnknownNode(id.0))
    }

    pub fn get(&self, id: NodeId) -> Option<BlockRef<'_>> {
        (id.0 < self.slots.len()).then_some(BlockRef { index: self, id })
    }

    /// Highest node inserted so far; the first one wins on equal heights.
    pub fn tip(&self) -> Option<BlockRef<'_>> {
        self.tip.map(|id| BlockRef { index: self, id })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Borrowed handle to a node of a [`ChainIndex`].
#[derive(Clone, Copy, Debug)]
pub struct BlockRef<'a> {
    index: &'a ChainIndex,
    id: NodeId,
}

impl<'a> BlockRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn header(&self) -> &'a HeaderEntry {
        &self.index.slots[self.id.0].header
    }
}

impl ChainNode for BlockRef<'_> {
    fn height(&self) -> u64 {
        self.header().height
    }

    fn time(&self) -> i64 {
        self.header().time
    }

    fn bits(&self) -> u32 {
        self.header().bits
    }

    fn predecessor(&self) -> Option<Self> {
        self.index.slots[self.id.0].prev.map(|id| BlockRef {
            index: self.index,
            id,
        })
    }
}
