use crate::config::{Config, SAMPLING_LOOP_FACTOR};
use crate::cost::Evaluator;
use crate::prelude::*;
use crate::rng::Rng;
use crate::stack::DieStack;
use crate::stats::FinalReport;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A successfully applied layout operation with everything needed to revert
/// it.
#[derive(Debug, Clone, Copy)]
enum LayoutOp {
    SwapWithin { die: usize, i: usize, j: usize },
    SwapAcross { d1: usize, d2: usize, i: usize, j: usize },
    MoveTuple { d1: usize, d2: usize, i: usize, j: usize },
    SwitchDir { die: usize, i: usize },
    SwitchJuncts { die: usize, i: usize, old: u32 },
    SwitchOrient { die: usize, i: usize },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaOutcome {
    /// Whether any solution fitting the fixed outline was found.
    pub valid: bool,
    /// Cost of the best fitting solution, compared at fit ratio 1.
    pub best_cost: f64,
    pub init_temp: f64,
    /// Accepted operations over all temperature steps.
    pub accepted_ops: usize,
}

/// Simulated-annealing driver: greedy initial sampling to calibrate the
/// temperature schedule, then an adaptive three-phase cooling loop over
/// Metropolis inner steps, switching to the full cost function once the
/// first fitting layout appears.
#[derive(Debug)]
pub struct Annealer {
    config: Config,
    rng: Rng,
    eval: Evaluator,
    last_op: Option<LayoutOp>,
}

impl Annealer {
    pub fn new(config: Config) -> Self {
        Annealer {
            rng: Rng::seeded(config.seed),
            eval: Evaluator::new(&config),
            last_op: None,
            config,
        }
    }

    /// Inner-loop length, scaling superlinearly with the block count.
    fn inner_loop_max(&self, blocks: &BlockSet) -> usize {
        max(
            1,
            (self.config.loop_factor * (blocks.len() as f64).powf(4.0 / 3.0)) as usize,
        )
    }

    /// Pick one of the six operators uniformly and apply it with random
    /// arguments. Returns `None` without touching anything when the sampled
    /// operator's preconditions do not hold.
    fn random_op(&mut self, stack: &mut DieStack, blocks: &mut BlockSet) -> Option<LayoutOp> {
        let dies = stack.dies.len();
        match self.rng.index(0, 6) {
            0 => {
                let die = self.rng.index(0, dies);
                let len = stack.dies[die].cbl.len();
                if len <= 1 {
                    return None;
                }
                let i = self.rng.index(0, len);
                let mut j = self.rng.index(0, len);
                while i == j {
                    j = self.rng.index(0, len);
                }
                stack.swap_within(die, i, j);
                Some(LayoutOp::SwapWithin { die, i, j })
            }
            1 => {
                if dies < 2 {
                    return None;
                }
                let d1 = self.rng.index(0, dies);
                let mut d2 = self.rng.index(0, dies);
                while d1 == d2 {
                    d2 = self.rng.index(0, dies);
                }
                let (len1, len2) = (stack.dies[d1].cbl.len(), stack.dies[d2].cbl.len());
                if len1 == 0 || len2 == 0 {
                    return None;
                }
                let i = self.rng.index(0, len1);
                let j = self.rng.index(0, len2);
                stack.swap_across(d1, d2, i, j);
                Some(LayoutOp::SwapAcross { d1, d2, i, j })
            }
            2 => {
                if dies < 2 {
                    return None;
                }
                let d1 = self.rng.index(0, dies);
                let mut d2 = self.rng.index(0, dies);
                while d1 == d2 {
                    d2 = self.rng.index(0, dies);
                }
                let len1 = stack.dies[d1].cbl.len();
                if len1 == 0 {
                    return None;
                }
                let i = self.rng.index(0, len1);
                let len2 = stack.dies[d2].cbl.len();
                let j = if len2 == 0 { 0 } else { self.rng.index(0, len2) };
                stack.move_tuple(d1, d2, i, j);
                Some(LayoutOp::MoveTuple { d1, d2, i, j })
            }
            3 => {
                let die = self.rng.index(0, dies);
                let len = stack.dies[die].cbl.len();
                if len == 0 {
                    return None;
                }
                let i = self.rng.index(0, len);
                stack.switch_dir(die, i);
                Some(LayoutOp::SwitchDir { die, i })
            }
            4 => {
                let die = self.rng.index(0, dies);
                let len = stack.dies[die].cbl.len();
                if len == 0 {
                    return None;
                }
                let i = self.rng.index(0, len);
                let old = stack.dies[die].cbl.juncts(i);
                // Step up from zero, otherwise a coin flip between up and
                // down. The decoder clamps, so no upper bound here.
                let new = if old == 0 {
                    1
                } else if self.rng.coin() {
                    old + 1
                } else {
                    old - 1
                };
                stack.switch_juncts(die, i, new);
                Some(LayoutOp::SwitchJuncts { die, i, old })
            }
            5 => {
                let die = self.rng.index(0, dies);
                let len = stack.dies[die].cbl.len();
                if len == 0 {
                    return None;
                }
                let i = self.rng.index(0, len);
                stack.switch_orient(die, i, blocks);
                Some(LayoutOp::SwitchOrient { die, i })
            }
            _ => unreachable!(),
        }
    }

    /// Undo the last applied operation by invoking its inverse.
    fn revert(&mut self, stack: &mut DieStack, blocks: &mut BlockSet) {
        let Some(op) = self.last_op.take() else {
            return;
        };
        match op {
            LayoutOp::SwapWithin { die, i, j } => stack.swap_within(die, j, i),
            LayoutOp::SwapAcross { d1, d2, i, j } => stack.swap_across(d2, d1, j, i),
            LayoutOp::MoveTuple { d1, d2, i, j } => stack.move_tuple(d2, d1, j, i),
            LayoutOp::SwitchDir { die, i } => stack.switch_dir(die, i),
            LayoutOp::SwitchJuncts { die, i, old } => stack.switch_juncts(die, i, old),
            LayoutOp::SwitchOrient { die, i } => stack.switch_orient(die, i, blocks),
        }
    }

    /// Run the full annealing process. The stack must hold an initial CBL
    /// assignment (see [`DieStack::init_random`]).
    pub fn run(
        &mut self,
        stack: &mut DieStack,
        blocks: &mut BlockSet,
        nets: &mut [Net],
    ) -> SaOutcome {
        if blocks.is_empty() || stack.dies.iter().all(|die| die.cbl.is_empty()) {
            warn!("no blocks to place");
            return SaOutcome::default();
        }

        self.eval.reset_maxima();
        stack.backup_all(blocks);
        let inner_loop_max = self.inner_loop_max(blocks);

        // ===== Initial sampling: greedy descent to measure the cost
        // landscape. A measurement only; the start CBLs are restored after.
        info!("sampling the solution space...");

        stack.generate_layout(blocks);
        let mut cur_cost = self
            .eval
            .evaluate(blocks, nets, &stack.reqs, 0.0, false, false)
            .total;

        let samples = SAMPLING_LOOP_FACTOR * inner_loop_max;
        let mut cost_hist = Vec::with_capacity(samples);
        let mut accepted = 0_usize;
        let mut attempts = 1_usize;
        while attempts <= samples {
            let Some(op) = self.random_op(stack, blocks) else {
                continue;
            };
            self.last_op = Some(op);

            let prev_cost = cur_cost;
            stack.generate_layout(blocks);
            cur_cost = self
                .eval
                .evaluate(blocks, nets, &stack.reqs, 0.0, false, false)
                .total;
            if cur_cost - prev_cost >= 0.0 {
                self.revert(stack, blocks);
                cur_cost = prev_cost;
            } else {
                accepted += 1;
            }
            cost_hist.push(cur_cost);
            attempts += 1;
        }

        let init_temp = stddev(&cost_hist) * self.config.temp_init_factor;
        let accept_ratio_offset = accepted as f64 / attempts as f64;
        // Acceptance-ratio boundaries between fast cooling, slow cooling and
        // reheating.
        let rho_1 = self.config.temp_phase_trans_12_factor * accept_ratio_offset;
        let rho_2 = self.config.temp_phase_trans_23_factor * accept_ratio_offset;
        debug!("initial temperature: {init_temp}");
        debug!("acceptance ratio offset: {accept_ratio_offset}, boundaries: {rho_1} / {rho_2}");

        stack.restore_all(blocks);

        // ===== Main annealing loop.
        info!("annealing, phase one: packing blocks into the outline...");

        let mut cur_temp = init_temp;
        let mut phase_two = false;
        let mut valid_layout_found = false;
        let mut layout_fit_ratio = 0.0;
        let mut total_accepted = 0_usize;
        // Large enough that the first fitting solution always becomes best.
        let mut best_cost = 100.0 * stddev(&cost_hist);

        for step in 1..=self.config.loop_limit {
            let mut ii = 1_usize;
            let mut accepted = 0_usize;
            let mut fit_counter = 0_usize;
            let mut avg_cost = 0.0;
            let mut phase_two_transit = false;

            stack.generate_layout(blocks);
            let mut cur_cost = self
                .eval
                .evaluate(blocks, nets, &stack.reqs, layout_fit_ratio, phase_two, false)
                .total;

            // Inner loop: Metropolis over layout operations. The fit ratio
            // is pinned for the whole step.
            while ii <= inner_loop_max {
                let Some(op) = self.random_op(stack, blocks) else {
                    continue;
                };
                self.last_op = Some(op);

                let prev_cost = cur_cost;
                stack.generate_layout(blocks);
                let eval = self.eval.evaluate(
                    blocks,
                    nets,
                    &stack.reqs,
                    layout_fit_ratio,
                    phase_two,
                    false,
                );
                cur_cost = eval.total;
                let cost_diff = cur_cost - prev_cost;

                let mut accept = true;
                if cost_diff >= 0.0 && self.rng.f64() > (-cost_diff / cur_temp).exp() {
                    accept = false;
                    self.revert(stack, blocks);
                    cur_cost = prev_cost;
                }

                if accept {
                    accepted += 1;
                    avg_cost += cur_cost;

                    if eval.fits {
                        fit_counter += 1;

                        if !phase_two {
                            phase_two = true;
                            phase_two_transit = true;
                            info!("phase two: optimizing within the outline, switching cost function...");
                        }

                        // Fitting solutions are compared at fit ratio 1, so
                        // they are ranked by the phase-two terms alone. The
                        // transit evaluation latches the normalization
                        // maxima.
                        let fitting_cost = self
                            .eval
                            .evaluate(blocks, nets, &stack.reqs, 1.0, true, phase_two_transit)
                            .total;
                        if fitting_cost < best_cost {
                            debug!("new best fitting solution, cost {fitting_cost}");
                            best_cost = fitting_cost;
                            stack.store_best_all(blocks);
                            valid_layout_found = true;
                        }
                    }
                }

                // After the phase transition the remaining inner step would
                // mix two cost functions; start the next step instead.
                if phase_two_transit {
                    break;
                }
                ii += 1;
            }

            total_accepted += accepted;
            layout_fit_ratio = if accepted > 0 {
                fit_counter as f64 / accepted as f64
            } else {
                0.0
            };
            let accepted_ratio = accepted as f64 / ii as f64;
            let avg = if accepted > 0 {
                avg_cost / accepted as f64
            } else {
                0.0
            };
            debug!(
                "step {step}/{}: accept ratio {accepted_ratio:.3}, fit ratio {layout_fit_ratio:.3}, avg cost {avg:.4}, temp {cur_temp:.4}",
                self.config.loop_limit
            );

            // Cool, or reheat with decaying strength when the acceptance
            // ratio collapses; without any valid layout yet the reheat is
            // squared to escape harder.
            if accepted_ratio > rho_1 {
                cur_temp *= self.config.temp_factor_phase1;
            } else if accepted_ratio > rho_2 {
                cur_temp *= self.config.temp_factor_phase2;
            } else {
                let loop_factor = 1.0 - step as f64 / self.config.loop_limit as f64;
                let reheat = if valid_layout_found {
                    self.config.temp_factor_phase3
                } else {
                    self.config.temp_factor_phase3 * self.config.temp_factor_phase3
                };
                cur_temp *= loop_factor * reheat;
            }
        }

        info!(
            "annealing done: valid layout found: {valid_layout_found}, {total_accepted} accepted ops"
        );
        SaOutcome {
            valid: valid_layout_found,
            best_cost,
            init_temp,
            accepted_ops: total_accepted,
        }
    }

    /// Apply the best stored solution and compute the final report. Without
    /// a stored best the current (non-fitting) layout is decoded and
    /// reported as a debugging aid.
    pub fn finalize(
        &mut self,
        stack: &mut DieStack,
        blocks: &mut BlockSet,
        nets: &mut [Net],
        runtime: Duration,
    ) -> FinalReport {
        let valid = stack.apply_best_all(blocks);
        if !valid {
            info!("no best (fitting) solution available");
        }
        stack.generate_layout(blocks);

        let cost = self
            .eval
            .evaluate(blocks, nets, &stack.reqs, 1.0, true, false)
            .total;
        let interconnect = self.eval.interconnects(blocks, nets, false, false);
        let thermal = self.eval.thermal(blocks, false, false);

        FinalReport {
            valid,
            cost,
            max_occupation: self.eval.max_occupation(blocks),
            hpwl: interconnect.hpwl,
            tsvs: interconnect.tsvs,
            thermal,
            runtime_secs: runtime.as_secs_f64(),
        }
    }
}

/// Population standard deviation.
fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
