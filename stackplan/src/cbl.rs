use crate::prelude::*;
use itertools::Itertools;

/// One corner-block-list entry: the block to place, the placement direction,
/// and the number of T-junctions to cover, i.e. how many frontier blocks the
/// decoder consumes beyond the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple {
    pub block: BlockId,
    pub dir: Direction,
    pub juncts: u32,
}

/// A corner block list: three parallel sequences of equal length. The scan
/// order of the sequences is the decode order and is semantically
/// significant.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CornerBlockList {
    s: Vec<BlockId>,
    l: Vec<Direction>,
    t: Vec<u32>,
}

impl CornerBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_lengths(&self) {
        debug_assert!(
            self.s.len() == self.l.len() && self.l.len() == self.t.len(),
            "CBL sequence length mismatch: |S|={} |L|={} |T|={}",
            self.s.len(),
            self.l.len(),
            self.t.len()
        );
    }

    pub fn len(&self) -> usize {
        self.check_lengths();
        self.s.len()
    }

    pub fn capacity(&self) -> usize {
        self.s.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn clear(&mut self) {
        self.s.clear();
        self.l.clear();
        self.t.clear();
    }

    pub fn reserve(&mut self, elements: usize) {
        self.s.reserve(elements);
        self.l.reserve(elements);
        self.t.reserve(elements);
    }

    pub fn push(&mut self, tuple: Tuple) {
        self.s.push(tuple.block);
        self.l.push(tuple.dir);
        self.t.push(tuple.juncts);
        self.check_lengths();
    }

    pub fn get(&self, i: usize) -> Tuple {
        Tuple {
            block: self.s[i],
            dir: self.l[i],
            juncts: self.t[i],
        }
    }

    pub fn block(&self, i: usize) -> BlockId {
        self.s[i]
    }

    pub fn dir(&self, i: usize) -> Direction {
        self.l[i]
    }

    pub fn juncts(&self, i: usize) -> u32 {
        self.t[i]
    }

    /// Swap the block references of two tuples; `L` and `T` stay put.
    pub fn swap_blocks(&mut self, i: usize, j: usize) {
        self.s.swap(i, j);
    }

    pub fn set_block(&mut self, i: usize, block: BlockId) {
        self.s[i] = block;
    }

    pub fn set_dir(&mut self, i: usize, dir: Direction) {
        self.l[i] = dir;
    }

    pub fn set_juncts(&mut self, i: usize, juncts: u32) {
        self.t[i] = juncts;
    }

    pub fn insert_at(&mut self, i: usize, tuple: Tuple) {
        self.s.insert(i, tuple.block);
        self.l.insert(i, tuple.dir);
        self.t.insert(i, tuple.juncts);
        self.check_lengths();
    }

    pub fn remove_at(&mut self, i: usize) -> Tuple {
        let tuple = Tuple {
            block: self.s.remove(i),
            dir: self.l.remove(i),
            juncts: self.t.remove(i),
        };
        self.check_lengths();
        tuple
    }

    /// `( id dir T w h )` with the block's current dimensions, so orientation
    /// switches show up in the output.
    pub fn tuple_string(&self, i: usize, blocks: &BlockSet) -> String {
        let b = &blocks[self.s[i]];
        format!(
            "( {} {} {} {} {} )",
            b.name, self.l[i], self.t[i], b.bb.w, b.bb.h
        )
    }

    pub fn cbl_string(&self, blocks: &BlockSet) -> String {
        (0..self.len())
            .map(|i| self.tuple_string(i, blocks))
            .join(" , ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(block: BlockId, dir: Direction, juncts: u32) -> Tuple {
        Tuple { block, dir, juncts }
    }

    #[test]
    fn push_insert_remove_keep_sequences_parallel() {
        let mut cbl = CornerBlockList::new();
        assert!(cbl.is_empty());
        cbl.push(tuple(0, Direction::Horizontal, 0));
        cbl.push(tuple(1, Direction::Vertical, 2));
        cbl.insert_at(1, tuple(2, Direction::Horizontal, 1));
        assert_eq!(cbl.len(), 3);
        assert_eq!(cbl.get(1), tuple(2, Direction::Horizontal, 1));

        let removed = cbl.remove_at(0);
        assert_eq!(removed, tuple(0, Direction::Horizontal, 0));
        assert_eq!(cbl.len(), 2);
        assert_eq!(cbl.get(0), tuple(2, Direction::Horizontal, 1));
    }

    #[test]
    fn swap_blocks_leaves_dir_and_juncts() {
        let mut cbl = CornerBlockList::new();
        cbl.push(tuple(0, Direction::Horizontal, 0));
        cbl.push(tuple(1, Direction::Vertical, 3));
        cbl.swap_blocks(0, 1);
        assert_eq!(cbl.get(0), tuple(1, Direction::Horizontal, 0));
        assert_eq!(cbl.get(1), tuple(0, Direction::Vertical, 3));
    }

    #[test]
    fn pretty_print_reflects_orientation() {
        let mut blocks = BlockSet::new();
        let a = blocks.insert(Block::new("a", 2.0, 3.0)).unwrap();
        let mut cbl = CornerBlockList::new();
        cbl.push(tuple(a, Direction::Horizontal, 0));
        assert_eq!(cbl.tuple_string(0, &blocks), "( a H 0 2 3 )");
        blocks[a].bb.rotate();
        assert_eq!(cbl.tuple_string(0, &blocks), "( a H 0 3 2 )");
    }
}
