use crate::{BlockId, BlockSet};
use std::str::FromStr;
use tracing::warn;

/// Per-axis alignment flavor: a fixed offset, a symmetric range, or no
/// constraint on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignKind {
    Offset,
    Range,
    Undef,
}

impl FromStr for AlignKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offset" => Ok(AlignKind::Offset),
            "range" => Ok(AlignKind::Range),
            "undef" => Ok(AlignKind::Undef),
            other => Err(format!(
                "unknown alignment kind `{other}`, expected offset, range or undef"
            )),
        }
    }
}

/// Alignment requirement between two blocks. The constraint is expressed on
/// the lower-left corners: for `Offset`, `b.ll - a.ll` must equal the value;
/// for `Range`, its magnitude must not exceed the value.
#[derive(Debug, Clone)]
pub struct AlignmentReq {
    pub a: BlockId,
    pub b: BlockId,
    pub kind_x: AlignKind,
    pub val_x: f64,
    pub kind_y: AlignKind,
    pub val_y: f64,
    /// Set by the decoder when the requirement could not be honored; reset at
    /// the start of every layout generation.
    pub failed: bool,
}

impl AlignmentReq {
    /// Negative range values are invalid and clamped to zero.
    pub fn new(
        a: BlockId,
        b: BlockId,
        kind_x: AlignKind,
        mut val_x: f64,
        kind_y: AlignKind,
        mut val_y: f64,
    ) -> Self {
        if kind_x == AlignKind::Range && val_x < 0.0 {
            warn!("fixing negative x range {val_x} of alignment ({a}, {b}) to 0");
            val_x = 0.0;
        }
        if kind_y == AlignKind::Range && val_y < 0.0 {
            warn!("fixing negative y range {val_y} of alignment ({a}, {b}) to 0");
            val_y = 0.0;
        }
        AlignmentReq {
            a,
            b,
            kind_x,
            val_x,
            kind_y,
            val_y,
            failed: false,
        }
    }

    pub fn partner(&self, id: BlockId) -> Option<BlockId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }

    /// Allowed interval for the lower-left coordinate of `placing` on one
    /// axis, given the partner's already-placed coordinate on that axis.
    fn interval(
        &self,
        placing: BlockId,
        kind: AlignKind,
        val: f64,
        partner_ll: f64,
    ) -> Option<(f64, f64)> {
        match kind {
            AlignKind::Undef => None,
            AlignKind::Range => Some((partner_ll - val, partner_ll + val)),
            AlignKind::Offset => {
                // The offset is directed from `a` to `b`.
                let target = if placing == self.b {
                    partner_ll + val
                } else {
                    partner_ll - val
                };
                Some((target, target))
            }
        }
    }

    pub fn interval_x(&self, placing: BlockId, partner_ll_x: f64) -> Option<(f64, f64)> {
        self.interval(placing, self.kind_x, self.val_x, partner_ll_x)
    }

    pub fn interval_y(&self, placing: BlockId, partner_ll_y: f64) -> Option<(f64, f64)> {
        self.interval(placing, self.kind_y, self.val_y, partner_ll_y)
    }

    /// Squared violation of the requirement under the current coordinates.
    pub fn penalty(&self, blocks: &BlockSet) -> f64 {
        let dx = blocks[self.b].bb.ll.x - blocks[self.a].bb.ll.x;
        let dy = blocks[self.b].bb.ll.y - blocks[self.a].bb.ll.y;
        Self::axis_penalty(self.kind_x, self.val_x, dx) + Self::axis_penalty(self.kind_y, self.val_y, dy)
    }

    fn axis_penalty(kind: AlignKind, val: f64, delta: f64) -> f64 {
        match kind {
            AlignKind::Undef => 0.0,
            AlignKind::Offset => (delta - val) * (delta - val),
            AlignKind::Range => {
                let excess = (delta.abs() - val).max(0.0);
                excess * excess
            }
        }
    }
}
