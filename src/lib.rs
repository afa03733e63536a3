//! RoostSwarm Core v0.3.0 - Chicken Swarm Optimization
//!
//! A step-driven population optimizer. Agents are split into roosters, hens,
//! mother hens and chicks; each role moves by its own rule and the hierarchy is
//! rebuilt from fitness every few iterations. The caller drives the run by
//! alternating `step` and `call_objective`, or hands it to `run_to_completion`.

pub mod core;
pub mod swarm;
pub mod utils;

pub use core::{
    BoundaryMode, Constraint, MemoryLogger, Objective, ProblemConfig, SwarmConfig, SwarmError,
    StdoutLogger, SwarmLogger, SwarmResult, TracingLogger, Unconstrained,
};
pub use swarm::{ChickenSwarm, Optimizer, StepPhase, SwarmState};
pub use utils::{run_to_completion, RunOptions, RunReport};

/// Initialize tracing for the library.
///
/// Required for the default `TracingLogger` reports to reach standard output.
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
