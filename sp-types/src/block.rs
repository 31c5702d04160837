use crate::Rect;
use rustc_hash::FxHashMap as HashMap;
use std::ops::{Index, IndexMut};

/// Index of a block in the process-wide [`BlockSet`] arena. CBL tuples, nets
/// and alignment requirements all reference blocks through this index.
pub type BlockId = usize;

/// A rectangular hardware block. Dimensions live inside `bb` (`bb.w`,
/// `bb.h`), so an orientation switch is a plain swap there and snapshotting
/// `bb` also snapshots the orientation.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    /// Current placement; rewritten from scratch on every layout decode.
    pub bb: Rect,
    /// Die the block was last placed on.
    pub layer: usize,
    /// Shadow boxes written by the snapshot machinery only.
    pub bb_backup: Rect,
    pub bb_best: Rect,
}

impl Block {
    pub fn new(name: impl Into<String>, w: f64, h: f64) -> Self {
        let bb = Rect::sized(w, h);
        Block {
            name: name.into(),
            bb,
            layer: 0,
            bb_backup: bb,
            bb_best: bb,
        }
    }
}

/// Owning arena for all blocks of a run. Read-only after load, except for the
/// coordinate fields the decoder and snapshot machinery rewrite.
#[derive(Debug, Default)]
pub struct BlockSet {
    blocks: Vec<Block>,
    by_name: HashMap<String, BlockId>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when a block of the same name already exists.
    pub fn insert(&mut self, block: Block) -> Option<BlockId> {
        if self.by_name.contains_key(&block.name) {
            return None;
        }
        let id = self.blocks.len();
        self.by_name.insert(block.name.clone(), id);
        self.blocks.push(block);
        Some(id)
    }

    pub fn lookup(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks in insertion order. Iteration never goes through the name map,
    /// so the order is deterministic.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = BlockId> {
        0..self.blocks.len()
    }
}

impl Index<BlockId> for BlockSet {
    type Output = Block;
    fn index(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }
}

impl IndexMut<BlockId> for BlockSet {
    fn index_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id]
    }
}
