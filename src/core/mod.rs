//! Shared primitives: agent table, configuration, collaborator traits, errors.

pub mod agent;
pub mod callbacks;
pub mod config;
pub mod error;

pub use agent::{l2_norm, AgentPool, Rank, Role, UNSET_FITNESS};
pub use callbacks::{
    Constraint, MemoryLogger, Objective, StdoutLogger, SwarmLogger, TracingLogger, Unconstrained,
};
pub use config::{BoundaryMode, ProblemConfig, SwarmConfig};
pub use error::{SwarmError, SwarmResult};
