//! 3D (multi-die) floorplanning core: the corner-block-list layout
//! representation, its deterministic decoder, and the simulated-annealing
//! optimizer driving it.

mod anneal;
mod cbl;
mod config;
mod cost;
mod die;
mod error;
mod rng;
mod stack;
mod stats;

pub use anneal::{Annealer, SaOutcome};
pub use cbl::{CornerBlockList, Tuple};
pub use config::{Config, Verbosity};
pub use cost::{Evaluation, Evaluator, Interconnect};
pub use die::Die;
pub use error::{Error, Result};
pub use rng::Rng;
pub use stack::DieStack;
pub use stats::FinalReport;

mod prelude {
    pub use sp_types::*;
    pub use std::cmp::{max, min};
}
