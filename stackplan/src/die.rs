use crate::cbl::CornerBlockList;
use crate::prelude::*;
use tracing::trace;

/// Allowed lower-left coordinate intervals for the block being placed,
/// derived from an alignment requirement whose partner is already placed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlacementClamp {
    pub x: Option<(f64, f64)>,
    pub y: Option<(f64, f64)>,
}

impl PlacementClamp {
    pub fn none() -> Self {
        Self::default()
    }

    /// Clamp one axis: the frontier coordinate is a hard lower bound, the
    /// interval is honored when that still allows it. Returns the coordinate
    /// and whether the interval was satisfiable.
    fn apply(frontier: f64, interval: Option<(f64, f64)>) -> (f64, bool) {
        match interval {
            None => (frontier, true),
            Some((lo, hi)) => {
                if hi < frontier {
                    (frontier, false)
                } else {
                    (frontier.max(lo), true)
                }
            }
        }
    }
}

/// One die of the stack: its live CBL, the decode cursor, the two frontier
/// stacks, and the snapshot CBLs.
#[derive(Debug, Default)]
pub struct Die {
    pub id: usize,
    pub cbl: CornerBlockList,
    /// Index of the next tuple to decode.
    pi: usize,
    hi: Vec<BlockId>,
    vi: Vec<BlockId>,
    pub backup: CornerBlockList,
    pub best: CornerBlockList,
    /// Whether `best` has ever been written. An empty die is a valid best,
    /// so emptiness alone cannot tell.
    pub(crate) best_stored: bool,
    pub stalled: bool,
    done: bool,
}

impl Die {
    pub fn new(id: usize) -> Self {
        Die {
            id,
            ..Default::default()
        }
    }

    /// Rewind the decode cursor and drop the frontier stacks. A die with an
    /// empty CBL has nothing to decode and starts out done.
    pub fn reset(&mut self) {
        self.pi = 0;
        self.stalled = false;
        self.done = self.cbl.is_empty();
        self.hi.clear();
        self.vi.clear();
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn cursor(&self) -> usize {
        self.pi
    }

    pub fn current_block(&self) -> BlockId {
        self.cbl.block(self.pi)
    }

    /// Move the cursor to the next tuple; returns `false` when the last tuple
    /// has been decoded and the die is done.
    pub fn advance(&mut self) -> bool {
        if self.pi + 1 == self.cbl.len() {
            self.done = true;
            false
        } else {
            self.pi += 1;
            true
        }
    }

    /// Decode the tuple under the cursor into coordinates for its block.
    ///
    /// The frontier stack matching the tuple direction donates up to
    /// `juncts + 1` blocks; the new block starts where their opposite front
    /// ends (primary axis) and at their lowest near edge (secondary axis).
    /// Returns the placed block and whether the clamp intervals could be
    /// honored.
    pub fn place_current_block(
        &mut self,
        blocks: &mut BlockSet,
        clamp: PlacementClamp,
    ) -> (BlockId, bool) {
        let tuple = self.cbl.get(self.pi);
        let id = tuple.block;
        blocks[id].layer = self.id;

        let stack = match tuple.dir {
            Direction::Horizontal => &mut self.hi,
            Direction::Vertical => &mut self.vi,
        };
        let count = min(tuple.juncts as usize + 1, stack.len());
        let mut relevant = stack.split_off(stack.len() - count);
        relevant.reverse();

        // Primary axis: the far front of the consumed blocks. Secondary axis:
        // their lowest near edge. Both zero when nothing was consumed.
        let mut primary = 0.0_f64;
        let mut secondary = 0.0_f64;
        match tuple.dir {
            Direction::Horizontal => {
                for &r in &relevant {
                    primary = primary.max(blocks[r].bb.ur.x);
                }
                if let Some(&first) = relevant.first() {
                    secondary = relevant
                        .iter()
                        .fold(blocks[first].bb.ll.y, |m, &r| m.min(blocks[r].bb.ll.y));
                }
            }
            Direction::Vertical => {
                for &r in &relevant {
                    primary = primary.max(blocks[r].bb.ur.y);
                }
                if let Some(&first) = relevant.first() {
                    secondary = relevant
                        .iter()
                        .fold(blocks[first].bb.ll.x, |m, &r| m.min(blocks[r].bb.ll.x));
                }
            }
        }

        let ((x, x_ok), (y, y_ok)) = match tuple.dir {
            Direction::Horizontal => (
                PlacementClamp::apply(primary, clamp.x),
                PlacementClamp::apply(secondary, clamp.y),
            ),
            Direction::Vertical => (
                PlacementClamp::apply(secondary, clamp.x),
                PlacementClamp::apply(primary, clamp.y),
            ),
        };

        blocks[id].bb.place_at(x, y);
        self.hi.push(id);
        self.vi.push(id);

        trace!(
            "die {}: placed {} at ({x}, {y}) size ({}, {})",
            self.id,
            blocks[id].name,
            blocks[id].bb.w,
            blocks[id].bb.h
        );
        (id, x_ok && y_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbl::Tuple;

    fn die_with(tuples: &[(BlockId, Direction, u32)]) -> Die {
        let mut die = Die::new(0);
        for &(block, dir, juncts) in tuples {
            die.cbl.push(Tuple { block, dir, juncts });
        }
        die.reset();
        die
    }

    fn decode_all(die: &mut Die, blocks: &mut BlockSet) {
        loop {
            die.place_current_block(blocks, PlacementClamp::none());
            if !die.advance() {
                break;
            }
        }
    }

    #[test]
    fn two_blocks_in_a_row() {
        let mut blocks = BlockSet::new();
        let a = blocks.insert(Block::new("a", 2.0, 3.0)).unwrap();
        let b = blocks.insert(Block::new("b", 4.0, 1.0)).unwrap();
        let mut die = die_with(&[(a, Direction::Horizontal, 0), (b, Direction::Horizontal, 0)]);
        decode_all(&mut die, &mut blocks);

        assert_eq!(blocks[a].bb.ll, Point::new(0.0, 0.0));
        assert_eq!(blocks[a].bb.ur, Point::new(2.0, 3.0));
        assert_eq!(blocks[b].bb.ll, Point::new(2.0, 0.0));
        assert_eq!(blocks[b].bb.ur, Point::new(6.0, 1.0));
        assert!(die.done());
    }

    #[test]
    fn t_junction_consumes_two() {
        let mut blocks = BlockSet::new();
        let a = blocks.insert(Block::new("a", 1.0, 1.0)).unwrap();
        let b = blocks.insert(Block::new("b", 1.0, 1.0)).unwrap();
        let c = blocks.insert(Block::new("c", 3.0, 1.0)).unwrap();
        let mut die = die_with(&[
            (a, Direction::Horizontal, 0),
            (b, Direction::Vertical, 0),
            (c, Direction::Horizontal, 1),
        ]);
        decode_all(&mut die, &mut blocks);

        // c consumes both a and b from the horizontal frontier.
        assert_eq!(blocks[c].bb.ll, Point::new(1.0, 0.0));
        assert_eq!(blocks[c].bb.ur, Point::new(4.0, 1.0));
    }

    #[test]
    fn junction_count_is_clamped_by_stack_depth() {
        let mut blocks = BlockSet::new();
        let a = blocks.insert(Block::new("a", 2.0, 2.0)).unwrap();
        let b = blocks.insert(Block::new("b", 1.0, 1.0)).unwrap();
        // t far larger than the frontier: decodes like t = 0.
        let mut die = die_with(&[(a, Direction::Horizontal, 0), (b, Direction::Horizontal, 99)]);
        decode_all(&mut die, &mut blocks);
        assert_eq!(blocks[b].bb.ll, Point::new(2.0, 0.0));
    }

    #[test]
    fn empty_cbl_is_done_immediately() {
        let mut die = Die::new(0);
        die.reset();
        assert!(die.done());
    }

    #[test]
    fn coordinates_stay_non_negative() {
        let mut blocks = BlockSet::new();
        let ids: Vec<_> = (0..6)
            .map(|i| {
                blocks
                    .insert(Block::new(format!("b{i}"), 1.0 + i as f64, 2.0))
                    .unwrap()
            })
            .collect();
        let dirs = [
            Direction::Horizontal,
            Direction::Vertical,
            Direction::Vertical,
            Direction::Horizontal,
            Direction::Vertical,
            Direction::Horizontal,
        ];
        let mut die = Die::new(0);
        for (i, &b) in ids.iter().enumerate() {
            die.cbl.push(Tuple {
                block: b,
                dir: dirs[i],
                juncts: (i % 3) as u32,
            });
        }
        die.reset();
        decode_all(&mut die, &mut blocks);
        for &b in &ids {
            let bb = blocks[b].bb;
            assert!(bb.ll.x >= 0.0 && bb.ll.y >= 0.0);
            assert_eq!(bb.ur.x, bb.ll.x + bb.w);
            assert_eq!(bb.ur.y, bb.ll.y + bb.h);
        }
    }
}
