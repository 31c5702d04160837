use crate::config::{Config, HEAT_ACCUMULATION, THERMAL_GRID_DIM};
use crate::prelude::*;
use tracing::trace;

/// Result of one cost evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluation {
    pub total: f64,
    /// Whether every die's blocks-outline sits inside the fixed outline.
    pub fits: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Interconnect {
    pub hpwl: f64,
    pub tsvs: f64,
}

/// Weighted multi-term cost over a decoded layout. The per-term maxima are
/// latched once, at the first phase-two evaluation, and normalize all later
/// evaluations; terms may exceed 1 afterwards.
#[derive(Debug)]
pub struct Evaluator {
    layers: usize,
    outline_x: f64,
    outline_y: f64,
    outline_ar: f64,
    w_area: f64,
    w_wl: f64,
    w_tsvs: f64,
    w_temp: f64,
    w_align: f64,
    max_wl: f64,
    max_tsvs: f64,
    max_temp: f64,
    max_align: f64,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        Evaluator {
            layers: config.layers,
            outline_x: config.outline_x,
            outline_y: config.outline_y,
            outline_ar: config.outline_aspect_ratio(),
            w_area: config.cost_area_outline,
            w_wl: config.cost_wl,
            w_tsvs: config.cost_tsvs,
            w_temp: config.cost_temp,
            w_align: config.cost_align,
            max_wl: 0.0,
            max_tsvs: 0.0,
            max_temp: 0.0,
            max_align: 0.0,
        }
    }

    pub fn reset_maxima(&mut self) {
        self.max_wl = 0.0;
        self.max_tsvs = 0.0;
        self.max_temp = 0.0;
        self.max_align = 0.0;
    }

    /// Adaptive two-phase cost. Phase one is driven by the area/outline term
    /// alone (with its weight inverted back out); phase two adds wirelength,
    /// TSVs, thermal distribution and alignment violations. `set_max` latches
    /// the normalization maxima and is passed only on the phase transition.
    pub fn evaluate(
        &mut self,
        blocks: &BlockSet,
        nets: &mut [Net],
        reqs: &[AlignmentReq],
        fit_ratio: f64,
        phase_two: bool,
        set_max: bool,
    ) -> Evaluation {
        let area = self.area_outline(blocks, fit_ratio);

        let total = if phase_two {
            let ic = if self.w_wl == 0.0 && self.w_tsvs == 0.0 {
                Interconnect::default()
            } else {
                self.interconnects(blocks, nets, set_max, true)
            };
            let temp = if self.w_temp == 0.0 {
                0.0
            } else {
                self.thermal(blocks, set_max, true)
            };
            let align = if self.w_align == 0.0 {
                0.0
            } else {
                self.alignment(blocks, reqs, set_max, true)
            };
            self.w_wl * ic.hpwl
                + self.w_tsvs * ic.tsvs
                + self.w_temp * temp
                + self.w_align * align
                + area.total
        } else {
            (1.0 / self.w_area) * area.total
        };

        trace!("layout cost: {total} (fits: {})", area.fits);
        Evaluation {
            total,
            fits: area.fits,
        }
    }

    /// Area and aspect-ratio mismatch, mutually weighted by the ratio of
    /// recently fitting solutions: a low ratio steers towards the outline
    /// shape, a high one towards packing.
    pub fn area_outline(&self, blocks: &BlockSet, fit_ratio: f64) -> Evaluation {
        let mut cost_outline = 0.0_f64;
        let mut cost_area = 0.0_f64;
        let mut fits = true;

        for layer in 0..self.layers {
            let (ox, oy) = self.blocks_outline(blocks, layer);

            let occupation = (ox * oy) / (self.outline_x * self.outline_y);
            cost_area = cost_area.max(occupation);

            // Empty dies take the target ratio, i.e. zero outline cost.
            let ar = if oy > 0.0 { ox / oy } else { self.outline_ar };
            let mismatch = ar - self.outline_ar;
            cost_outline = cost_outline.max(mismatch * mismatch);

            fits = fits && ox <= self.outline_x && oy <= self.outline_y;
        }

        cost_outline *= 0.5 * self.w_area * (1.0 - fit_ratio);
        cost_area *= 0.5 * self.w_area * (1.0 + fit_ratio);

        Evaluation {
            total: cost_outline + cost_area,
            fits,
        }
    }

    /// Blocks-outline of one die: the max upper-right corner over its blocks.
    fn blocks_outline(&self, blocks: &BlockSet, layer: usize) -> (f64, f64) {
        let mut ox = 0.0_f64;
        let mut oy = 0.0_f64;
        for b in blocks.iter().filter(|b| b.layer == layer) {
            ox = ox.max(b.bb.ur.x);
            oy = oy.max(b.bb.ur.y);
        }
        (ox, oy)
    }

    /// Maximum per-die occupation, for reporting.
    pub fn max_occupation(&self, blocks: &BlockSet) -> f64 {
        (0..self.layers)
            .map(|layer| {
                let (ox, oy) = self.blocks_outline(blocks, layer);
                (ox * oy) / (self.outline_x * self.outline_y)
            })
            .fold(0.0, f64::max)
    }

    /// Half-perimeter wirelength and TSV count over all nets.
    ///
    /// Each populated layer of a net contributes the HPWL of its blocks'
    /// bounding box, widened by the boxes on the next populated layer above;
    /// the vertical span to that layer is the TSV count. The topmost
    /// populated layer is already covered from below and contributes no term
    /// of its own.
    pub fn interconnects(
        &mut self,
        blocks: &BlockSet,
        nets: &mut [Net],
        set_max: bool,
        normalize: bool,
    ) -> Interconnect {
        let mut hpwl = 0.0;
        let mut tsvs = 0.0;
        let mut rects: Vec<Rect> = Vec::with_capacity(blocks.len());

        for net in nets.iter_mut() {
            net.set_layer_bounds(blocks, self.layers - 1);

            for layer in net.layer_bottom..=net.layer_top {
                rects.clear();
                rects.extend(
                    net.blocks
                        .iter()
                        .filter(|&&b| blocks[b].layer == layer)
                        .map(|&b| blocks[b].bb),
                );
                if rects.is_empty() {
                    continue;
                }

                // The next populated layer above pins down a reasonable
                // bounding box before any TSVs are placed.
                let mut above = None;
                for upper in layer + 1..=net.layer_top {
                    let before = rects.len();
                    rects.extend(
                        net.blocks
                            .iter()
                            .filter(|&&b| blocks[b].layer == upper)
                            .map(|&b| blocks[b].bb),
                    );
                    if rects.len() > before {
                        above = Some(upper);
                        break;
                    }
                }

                // No populated layer above: these boxes were already folded
                // into the widened box of the layer below.
                let Some(upper) = above else {
                    continue;
                };
                tsvs += (upper - layer) as f64;

                let bb = Rect::bounding(rects.iter());
                hpwl += bb.w + bb.h;
            }
        }

        if set_max {
            self.max_wl = hpwl;
            self.max_tsvs = tsvs;
        }
        if normalize {
            if self.max_wl > 0.0 {
                hpwl /= self.max_wl;
            }
            if self.max_tsvs > 0.0 {
                tsvs /= self.max_tsvs;
            }
        }
        Interconnect { hpwl, tsvs }
    }

    /// Thermal-distribution proxy: per-die power grids (block overlap area
    /// per tile), smoothed with a 3x3 binomial kernel, accumulated upwards
    /// with growing weight since upper layers dissipate worse. The cost is
    /// the hottest tile.
    pub fn thermal(&mut self, blocks: &BlockSet, set_max: bool, normalize: bool) -> f64 {
        let dim = THERMAL_GRID_DIM;
        let tile_w = self.outline_x / dim as f64;
        let tile_h = self.outline_y / dim as f64;

        let mut acc = vec![0.0_f64; dim * dim];
        let mut grid = vec![0.0_f64; dim * dim];

        for layer in 0..self.layers {
            grid.fill(0.0);
            for b in blocks.iter().filter(|b| b.layer == layer) {
                let x0 = ((b.bb.ll.x / tile_w).floor() as isize).clamp(0, dim as isize - 1) as usize;
                let x1 = ((b.bb.ur.x / tile_w).ceil() as isize).clamp(1, dim as isize) as usize;
                let y0 = ((b.bb.ll.y / tile_h).floor() as isize).clamp(0, dim as isize - 1) as usize;
                let y1 = ((b.bb.ur.y / tile_h).ceil() as isize).clamp(1, dim as isize) as usize;
                for ty in y0..y1 {
                    for tx in x0..x1 {
                        let mut tile = Rect::sized(tile_w, tile_h);
                        tile.place_at(tx as f64 * tile_w, ty as f64 * tile_h);
                        grid[ty * dim + tx] += b.bb.overlap(&tile);
                    }
                }
            }

            let weight = 1.0 + HEAT_ACCUMULATION * layer as f64;
            for ty in 0..dim {
                for tx in 0..dim {
                    acc[ty * dim + tx] += weight * Self::blur_at(&grid, dim, tx, ty);
                }
            }
        }

        let mut peak = acc.iter().fold(0.0_f64, |m, &v| m.max(v));
        if set_max {
            self.max_temp = peak;
        }
        if normalize && self.max_temp > 0.0 {
            peak /= self.max_temp;
        }
        peak
    }

    /// 3x3 binomial smoothing of one tile, with edge renormalization.
    fn blur_at(grid: &[f64], dim: usize, tx: usize, ty: usize) -> f64 {
        const KERNEL: [f64; 3] = [1.0, 2.0, 1.0];
        let mut sum = 0.0;
        let mut weight = 0.0;
        for (dy, ky) in (-1isize..=1).zip(KERNEL) {
            for (dx, kx) in (-1isize..=1).zip(KERNEL) {
                let x = tx as isize + dx;
                let y = ty as isize + dy;
                if x < 0 || y < 0 || x >= dim as isize || y >= dim as isize {
                    continue;
                }
                let k = kx * ky;
                sum += k * grid[y as usize * dim + x as usize];
                weight += k;
            }
        }
        sum / weight
    }

    /// Summed squared violations over all alignment requirements.
    pub fn alignment(
        &mut self,
        blocks: &BlockSet,
        reqs: &[AlignmentReq],
        set_max: bool,
        normalize: bool,
    ) -> f64 {
        let mut cost = reqs.iter().map(|r| r.penalty(blocks)).sum::<f64>();
        if set_max {
            self.max_align = cost;
        }
        if normalize && self.max_align > 0.0 {
            cost /= self.max_align;
        }
        cost
    }
}
