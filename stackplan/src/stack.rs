use crate::cbl::Tuple;
use crate::die::{Die, PlacementClamp};
use crate::prelude::*;
use crate::rng::Rng;
use itertools::Itertools;
use tracing::{debug, trace};

/// The ordered set of dies plus the alignment requirements spanning them.
/// Owns every layout operation the annealer mutates the representation with.
#[derive(Debug)]
pub struct DieStack {
    pub dies: Vec<Die>,
    pub reqs: Vec<AlignmentReq>,
}

impl DieStack {
    pub fn new(layers: usize, reqs: Vec<AlignmentReq>) -> Self {
        DieStack {
            dies: (0..layers).map(Die::new).collect(),
            reqs,
        }
    }

    /// Assign every block to a random die with a random direction and a
    /// random junction count bounded by that die's current tuple count.
    pub fn init_random(&mut self, blocks: &BlockSet, rng: &mut Rng) {
        for die in &mut self.dies {
            die.cbl.clear();
            die.cbl.reserve(blocks.len());
        }
        for block in blocks.ids() {
            let d = rng.index(0, self.dies.len());
            let dir = if rng.coin() {
                Direction::Horizontal
            } else {
                Direction::Vertical
            };
            let len = self.dies[d].cbl.len();
            let juncts = if len == 0 { 0 } else { rng.index(0, len) as u32 };
            self.dies[d].cbl.push(Tuple { block, dir, juncts });
        }
        debug!(
            "randomized die stack: {} blocks over {} dies",
            blocks.len(),
            self.dies.len()
        );
    }

    /// Decode all CBLs into block coordinates.
    ///
    /// Dies are visited in index order, sticking with the active die until it
    /// stalls on an alignment partner or finishes. A die stalls when the
    /// current block's partner sits unplaced on another die; decoding then
    /// switches to that die. A stall chain that reaches an already-stalled
    /// die is a circular wait: it is broken by placing the current block with
    /// plain frontier rules and marking the requirement failed.
    pub fn generate_layout(&mut self, blocks: &mut BlockSet) {
        for die in &mut self.dies {
            die.reset();
        }
        for req in &mut self.reqs {
            req.failed = false;
        }

        // Which die holds each block, for stall switching.
        let mut die_of = vec![usize::MAX; blocks.len()];
        for (d, die) in self.dies.iter().enumerate() {
            for i in 0..die.cbl.len() {
                die_of[die.cbl.block(i)] = d;
            }
        }
        let mut placed = vec![false; blocks.len()];

        let mut p = 0;
        loop {
            if self.dies[p].done() {
                match self.dies.iter().position(|die| !die.done()) {
                    Some(next) => {
                        p = next;
                        continue;
                    }
                    None => break,
                }
            }

            let cur = self.dies[p].current_block();

            // An unresolved requirement whose partner is still unplaced?
            let pending = self.reqs.iter().position(|r| {
                !r.failed && r.partner(cur).is_some_and(|q| !placed[q])
            });
            if let Some(ri) = pending {
                let q = self.reqs[ri].partner(cur).unwrap();
                let qd = die_of[q];
                // Stalling only helps when the partner sits on another,
                // unfinished die. A same-die partner aligns itself later,
                // against `cur`.
                if qd != usize::MAX && qd != p && !self.dies[qd].done() {
                    if !self.dies[qd].stalled {
                        trace!(
                            "die {p} stalls on {}, switching to die {qd}",
                            blocks[cur].name
                        );
                        self.dies[p].stalled = true;
                        p = qd;
                        continue;
                    }
                    // The partner's die is itself waiting: a circular
                    // stall. Break it by placing `cur` with plain frontier
                    // rules and failing the requirement.
                    debug!(
                        "circular alignment stall at {}, falling back to frontier placement",
                        blocks[cur].name
                    );
                    self.reqs[ri].failed = true;
                }
            }

            // The first requirement with a placed partner constrains the
            // placement.
            let mut clamp = PlacementClamp::none();
            let mut clamp_req = None;
            for (ri, r) in self.reqs.iter().enumerate() {
                if let Some(q) = r.partner(cur) {
                    if placed[q] && !r.failed {
                        clamp.x = r.interval_x(cur, blocks[q].bb.ll.x);
                        clamp.y = r.interval_y(cur, blocks[q].bb.ll.y);
                        clamp_req = Some(ri);
                        break;
                    }
                }
            }

            let (_, align_ok) = self.dies[p].place_current_block(blocks, clamp);
            if !align_ok {
                let ri = clamp_req.unwrap();
                debug!(
                    "alignment of {} and {} conflicts with the frontier, marking failed",
                    blocks[self.reqs[ri].a].name, blocks[self.reqs[ri].b].name
                );
                self.reqs[ri].failed = true;
            }
            placed[cur] = true;
            self.dies[p].stalled = false;
            self.dies[p].advance();
        }
    }

    // ===== Layout operations for the annealer. Preconditions (distinct
    // dies, in-bounds indices) are the caller's responsibility. =====

    pub fn swap_within(&mut self, die: usize, i: usize, j: usize) {
        self.dies[die].cbl.swap_blocks(i, j);
        trace!("swap within die {die}: tuples {i} <-> {j}");
    }

    pub fn swap_across(&mut self, d1: usize, d2: usize, i: usize, j: usize) {
        debug_assert_ne!(d1, d2);
        let a = self.dies[d1].cbl.block(i);
        let b = self.dies[d2].cbl.block(j);
        self.dies[d1].cbl.set_block(i, b);
        self.dies[d2].cbl.set_block(j, a);
        trace!("swap across dies {d1}/{d2}: tuples {i} <-> {j}");
    }

    pub fn move_tuple(&mut self, d1: usize, d2: usize, i: usize, j: usize) {
        debug_assert_ne!(d1, d2);
        let tuple = self.dies[d1].cbl.remove_at(i);
        self.dies[d2].cbl.insert_at(j, tuple);
        trace!("move tuple {i} of die {d1} to slot {j} of die {d2}");
    }

    pub fn switch_dir(&mut self, die: usize, i: usize) {
        let dir = self.dies[die].cbl.dir(i).toggled();
        self.dies[die].cbl.set_dir(i, dir);
        trace!("switch direction of tuple {i} on die {die}");
    }

    pub fn switch_juncts(&mut self, die: usize, i: usize, juncts: u32) {
        self.dies[die].cbl.set_juncts(i, juncts);
        trace!("set junctions of tuple {i} on die {die} to {juncts}");
    }

    pub fn switch_orient(&mut self, die: usize, i: usize, blocks: &mut BlockSet) {
        let b = self.dies[die].cbl.block(i);
        blocks[b].bb.rotate();
        trace!("switch orientation of {} on die {die}", blocks[b].name);
    }

    // ===== Snapshots. Block coordinates ride along in the blocks' shadow
    // boxes, so orientation switches survive the round trip. =====

    pub fn backup_all(&mut self, blocks: &mut BlockSet) {
        for die in &mut self.dies {
            for i in 0..die.cbl.len() {
                let b = die.cbl.block(i);
                blocks[b].bb_backup = blocks[b].bb;
            }
            die.backup = die.cbl.clone();
        }
    }

    pub fn restore_all(&mut self, blocks: &mut BlockSet) {
        for die in &mut self.dies {
            die.cbl = die.backup.clone();
            for i in 0..die.cbl.len() {
                let b = die.cbl.block(i);
                blocks[b].bb = blocks[b].bb_backup;
            }
        }
    }

    pub fn store_best_all(&mut self, blocks: &mut BlockSet) {
        for die in &mut self.dies {
            for i in 0..die.cbl.len() {
                let b = die.cbl.block(i);
                blocks[b].bb_best = blocks[b].bb;
            }
            die.best = die.cbl.clone();
            die.best_stored = true;
        }
    }

    /// Replace the live CBLs with the best snapshot. Fails when no best was
    /// ever stored.
    pub fn apply_best_all(&mut self, blocks: &mut BlockSet) -> bool {
        if self.dies.iter().any(|die| !die.best_stored) {
            return false;
        }
        for die in &mut self.dies {
            die.cbl = die.best.clone();
            for i in 0..die.cbl.len() {
                let b = die.cbl.block(i);
                blocks[b].bb = blocks[b].bb_best;
            }
        }
        true
    }

    /// Canonical serialization of all CBLs.
    pub fn cbls_string(&self, blocks: &BlockSet) -> String {
        let mut out = String::new();
        out.push_str("# tuple format: ( BLOCK_ID DIRECTION T-JUNCTS BLOCK_WIDTH BLOCK_HEIGHT )\n");
        out.push_str("data_start\n");
        for die in &self.dies {
            out.push_str(&format!("CBL [ {} ]\n", die.id));
            out.push_str(&die.cbl.cbl_string(blocks));
            out.push('\n');
        }
        out
    }

    /// Blocks per die, for logging.
    pub fn occupancy_string(&self) -> String {
        self.dies
            .iter()
            .map(|die| format!("die {}: {} blocks", die.id, die.cbl.len()))
            .join(", ")
    }
}
