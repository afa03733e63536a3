//! Swarm Engine
//!
//! Chicken swarm optimization: a rooster/hen/chick hierarchy searching a
//! bounded box, driven one agent at a time through a two-phase
//! move/evaluate protocol.

pub mod boundary;
pub mod engine;
pub mod movement;
pub mod optimizer;
pub mod population;
pub mod snapshot;
pub mod tracker;

pub use boundary::{BoundaryOutcome, BoundaryPolicy, Feasibility};
pub use engine::{ChickenSwarm, StepPhase};
pub use movement::MovementEngine;
pub use optimizer::Optimizer;
pub use population::{PopulationModel, RoleSplit};
pub use snapshot::SwarmState;
pub use tracker::ConvergenceTracker;

/// Guards fitness ratios against division by zero
pub const EPSILON: f64 = 1e-49;

/// Largest argument `f64::exp` takes without overflowing
pub const EXP_LIMIT: f64 = 709.0;

/// `exp` with its argument clamped to `[-EXP_LIMIT, EXP_LIMIT]`. NaN maps to 1.
#[inline]
pub fn clipped_exp(x: f64) -> f64 {
    if x.is_nan() {
        return 1.0;
    }
    x.clamp(-EXP_LIMIT, EXP_LIMIT).exp()
}
