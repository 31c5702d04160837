use crate::{BlockId, BlockSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetKind {
    IntraLayer,
    InterLayer,
}

impl FromStr for NetKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intra" => Ok(NetKind::IntraLayer),
            "inter" => Ok(NetKind::InterLayer),
            other => Err(format!("unknown net type `{other}`, expected intra or inter")),
        }
    }
}

/// A net connecting two or more blocks. `layer_bottom` and `layer_top` are
/// derived from the blocks' current layers and recomputed on every cost
/// evaluation.
#[derive(Debug, Clone)]
pub struct Net {
    pub name: String,
    pub kind: NetKind,
    pub blocks: Vec<BlockId>,
    pub layer_bottom: usize,
    pub layer_top: usize,
}

impl Net {
    pub fn new(name: impl Into<String>, kind: NetKind, blocks: Vec<BlockId>) -> Self {
        Net {
            name: name.into(),
            kind,
            blocks,
            layer_bottom: 0,
            layer_top: 0,
        }
    }

    /// Recompute the lowest and uppermost layer spanned by this net, clamped
    /// to `top_layer`.
    pub fn set_layer_bounds(&mut self, blocks: &BlockSet, top_layer: usize) {
        let mut bottom = top_layer;
        let mut top = 0;
        for &b in &self.blocks {
            let layer = blocks[b].layer.min(top_layer);
            bottom = bottom.min(layer);
            top = top.max(layer);
        }
        self.layer_bottom = bottom;
        self.layer_top = top;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Block;

    #[test]
    fn layer_bounds_follow_blocks() {
        let mut blocks = BlockSet::new();
        let a = blocks.insert(Block::new("a", 1.0, 1.0)).unwrap();
        let b = blocks.insert(Block::new("b", 1.0, 1.0)).unwrap();
        blocks[a].layer = 2;
        blocks[b].layer = 0;

        let mut net = Net::new("n", NetKind::InterLayer, vec![a, b]);
        net.set_layer_bounds(&blocks, 3);
        assert_eq!((net.layer_bottom, net.layer_top), (0, 2));

        // Layers above the stack are clamped.
        net.set_layer_bounds(&blocks, 1);
        assert_eq!((net.layer_bottom, net.layer_top), (0, 1));
    }
}
