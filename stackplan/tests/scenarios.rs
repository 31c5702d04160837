//! End-to-end checks of the decoder, the snapshot machinery, and the
//! annealer on small hand-built and randomized die stacks.

use sp_types::*;
use stackplan::{Annealer, Config, DieStack, Rng, Tuple, Verbosity};
use std::time::Duration;

fn config(layers: usize, outline: f64, seed: u64) -> Config {
    Config {
        layers,
        outline_x: outline,
        outline_y: outline,
        loop_factor: 1.0,
        loop_limit: 50,
        temp_init_factor: 20.0,
        temp_phase_trans_12_factor: 0.7,
        temp_phase_trans_23_factor: 0.5,
        temp_factor_phase1: 0.9,
        temp_factor_phase2: 0.97,
        temp_factor_phase3: 1.2,
        cost_area_outline: 0.5,
        cost_wl: 0.2,
        cost_tsvs: 0.1,
        cost_temp: 0.1,
        cost_align: 0.1,
        seed,
        log_level: Verbosity::Minimal,
    }
}

fn tuple(block: BlockId, dir: Direction, juncts: u32) -> Tuple {
    Tuple { block, dir, juncts }
}

#[test]
fn two_blocks_on_a_single_die() {
    let mut blocks = BlockSet::new();
    let a = blocks.insert(Block::new("a", 2.0, 3.0)).unwrap();
    let b = blocks.insert(Block::new("b", 4.0, 1.0)).unwrap();
    let mut stack = DieStack::new(1, vec![]);
    stack.dies[0].cbl.push(tuple(a, Direction::Horizontal, 0));
    stack.dies[0].cbl.push(tuple(b, Direction::Horizontal, 0));
    stack.generate_layout(&mut blocks);

    assert_eq!(blocks[a].bb.ll, Point::new(0.0, 0.0));
    assert_eq!(blocks[a].bb.ur, Point::new(2.0, 3.0));
    assert_eq!(blocks[b].bb.ll, Point::new(2.0, 0.0));
    assert_eq!(blocks[b].bb.ur, Point::new(6.0, 1.0));
}

#[test]
fn orientation_toggled_twice_restores_the_layout() {
    let mut blocks = BlockSet::new();
    let a = blocks.insert(Block::new("a", 2.0, 3.0)).unwrap();
    let b = blocks.insert(Block::new("b", 4.0, 1.0)).unwrap();
    let mut stack = DieStack::new(1, vec![]);
    stack.dies[0].cbl.push(tuple(a, Direction::Horizontal, 0));
    stack.dies[0].cbl.push(tuple(b, Direction::Horizontal, 0));
    stack.generate_layout(&mut blocks);
    let before: Vec<Rect> = blocks.iter().map(|blk| blk.bb).collect();

    stack.switch_orient(0, 1, &mut blocks);
    stack.generate_layout(&mut blocks);
    let rotated: Vec<Rect> = blocks.iter().map(|blk| blk.bb).collect();
    assert_ne!(before, rotated);

    stack.switch_orient(0, 1, &mut blocks);
    stack.generate_layout(&mut blocks);
    let after: Vec<Rect> = blocks.iter().map(|blk| blk.bb).collect();
    assert_eq!(before, after);
}

#[test]
fn snapshot_survives_a_hundred_mutations() {
    let mut rng = Rng::seeded(11);
    let mut blocks = BlockSet::new();
    for i in 0..50 {
        blocks
            .insert(Block::new(
                format!("b{i}"),
                1.0 + rng.index(1, 5) as f64,
                1.0 + rng.index(1, 5) as f64,
            ))
            .unwrap();
    }
    let mut stack = DieStack::new(2, vec![]);
    stack.init_random(&blocks, &mut rng);
    stack.generate_layout(&mut blocks);
    let recorded: Vec<Rect> = blocks.iter().map(|b| b.bb).collect();
    stack.backup_all(&mut blocks);

    for _ in 0..100 {
        let len0 = stack.dies[0].cbl.len();
        let len1 = stack.dies[1].cbl.len();
        match rng.index(0, 6) {
            0 if len0 > 1 => {
                let i = rng.index(0, len0);
                let j = (i + 1 + rng.index(0, len0 - 1)) % len0;
                stack.swap_within(0, i, j);
            }
            1 if len0 > 0 && len1 > 0 => {
                stack.swap_across(0, 1, rng.index(0, len0), rng.index(0, len1));
            }
            2 if len0 > 1 => {
                stack.move_tuple(0, 1, rng.index(0, len0), 0);
            }
            3 if len0 > 0 => stack.switch_dir(0, rng.index(0, len0)),
            4 if len1 > 0 => {
                let i = rng.index(0, len1);
                let old = stack.dies[1].cbl.juncts(i);
                stack.switch_juncts(1, i, old + 1);
            }
            _ if len1 > 0 => stack.switch_orient(1, rng.index(0, len1), &mut blocks),
            _ => {}
        }
    }
    stack.generate_layout(&mut blocks);

    stack.restore_all(&mut blocks);
    stack.generate_layout(&mut blocks);
    let redecoded: Vec<Rect> = blocks.iter().map(|b| b.bb).collect();
    assert_eq!(recorded, redecoded);
}

#[test]
fn annealing_packs_into_the_outline() {
    // Blocks totaling 80% of one die outline, spread over two dies.
    let config = config(2, 10.0, 7);
    let mut blocks = BlockSet::new();
    for i in 0..8 {
        blocks.insert(Block::new(format!("b{i}"), 2.0, 5.0)).unwrap();
    }
    let mut nets = vec![
        Net::new("n0", NetKind::InterLayer, vec![0, 3, 5]),
        Net::new("n1", NetKind::IntraLayer, vec![1, 2]),
    ];

    let mut stack = DieStack::new(config.layers, vec![]);
    let mut rng = Rng::seeded(config.seed);
    stack.init_random(&blocks, &mut rng);

    let mut annealer = Annealer::new(config);
    let outcome = annealer.run(&mut stack, &mut blocks, &mut nets);
    assert!(outcome.valid);

    let report = annealer.finalize(&mut stack, &mut blocks, &mut nets, Duration::ZERO);
    assert!(report.valid);
    assert!(report.max_occupation <= 1.0);
    for b in blocks.iter() {
        assert!(b.bb.ll.x >= 0.0 && b.bb.ll.y >= 0.0);
        assert!(b.bb.ur.x <= 10.0 && b.bb.ur.y <= 10.0);
    }
}

#[test]
fn fixed_seed_reproduces_the_run() {
    let run = || {
        let config = config(2, 12.0, 99);
        let mut blocks = BlockSet::new();
        for i in 0..10 {
            blocks
                .insert(Block::new(
                    format!("b{i}"),
                    1.0 + (i % 3) as f64,
                    2.0 + (i % 4) as f64,
                ))
                .unwrap();
        }
        let mut nets = vec![Net::new("n", NetKind::InterLayer, vec![0, 4, 7])];
        let mut stack = DieStack::new(config.layers, vec![]);
        let mut rng = Rng::seeded(config.seed);
        stack.init_random(&blocks, &mut rng);
        let mut annealer = Annealer::new(config);
        let outcome = annealer.run(&mut stack, &mut blocks, &mut nets);
        annealer.finalize(&mut stack, &mut blocks, &mut nets, Duration::ZERO);
        (outcome.best_cost, outcome.accepted_ops, stack.cbls_string(&blocks))
    };

    let (cost_a, accepted_a, cbls_a) = run();
    let (cost_b, accepted_b, cbls_b) = run();
    assert_eq!(cost_a, cost_b);
    assert_eq!(accepted_a, accepted_b);
    assert_eq!(cbls_a, cbls_b);
}
