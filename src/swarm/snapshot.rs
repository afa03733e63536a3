//! Serializable snapshot of a running swarm.

use super::population::RoleSplit;
use super::tracker::ConvergenceTracker;
use crate::core::{AgentPool, BoundaryMode, SwarmError, SwarmResult};
use serde::{Deserialize, Serialize};

/// All mutable state of a `ChickenSwarm`, enough to resume a run.
/// Collaborators (objective, constraint, logger) are not part of it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwarmState {
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub weights: Vec<f64>,
    pub targets: Vec<f64>,
    pub output_size: usize,

    pub split: RoleSplit,
    pub regroup_interval: u64,
    pub boundary: BoundaryMode,

    pub pool: AgentPool,
    pub tracker: ConvergenceTracker,

    pub cursor: usize,
    pub allow_update: bool,
    pub pending_fitness: Option<Vec<f64>>,
    pub last_outputs: Vec<f64>,
    pub last_fitness: Vec<f64>,
    pub last_regroup: u64,
    pub idle_steps: usize,
    pub failed_evaluations: usize,
    /// Spread of the flock when the run was first built
    #[serde(default)]
    pub initial_deviation: f64,
}

impl SwarmState {
    pub fn to_json(&self) -> SwarmResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SwarmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks that every column agrees with the declared sizes
    pub fn validate(&self) -> SwarmResult<()> {
        let dim = self.lower_bounds.len();
        let n = self.pool.n_agents;

        if dim == 0 || self.upper_bounds.len() != dim {
            return Err(SwarmError::Snapshot(format!(
                "bounds have {} and {} dimensions",
                dim,
                self.upper_bounds.len()
            )));
        }
        if self.pool.dimension != dim {
            return Err(SwarmError::DimensionMismatch {
                expected: dim,
                found: self.pool.dimension,
            });
        }
        for (name, len) in [
            ("weights", self.weights.len()),
            ("targets", self.targets.len()),
            ("global best fitness", self.tracker.global_best_fitness.len()),
        ] {
            if len != self.output_size {
                return Err(SwarmError::Snapshot(format!(
                    "{} has {} entries, output size is {}",
                    name, len, self.output_size
                )));
            }
        }
        if self.tracker.global_best_position.len() != dim {
            return Err(SwarmError::DimensionMismatch {
                expected: dim,
                found: self.tracker.global_best_position.len(),
            });
        }
        if self.split.total() != n {
            return Err(SwarmError::Snapshot(format!(
                "role split covers {} agents, pool has {}",
                self.split.total(),
                n
            )));
        }
        if n == 0 || self.cursor >= n {
            return Err(SwarmError::Snapshot(format!(
                "cursor {} outside a pool of {}",
                self.cursor, n
            )));
        }
        if self.regroup_interval == 0 {
            return Err(SwarmError::Snapshot("regroup interval is zero".to_string()));
        }

        let columns = [
            &self.pool.positions,
            &self.pool.velocities,
            &self.pool.last_valid,
            &self.pool.best_positions,
        ];
        for column in columns {
            if column.len() != n || column.iter().any(|v| v.len() != dim) {
                return Err(SwarmError::Snapshot(
                    "position columns do not match the pool size".to_string(),
                ));
            }
            if column.iter().flatten().any(|x| !x.is_finite()) {
                return Err(SwarmError::Snapshot(
                    "position columns hold non-finite coordinates".to_string(),
                ));
            }
        }
        if self.pool.best_fitness.len() != n
            || self.pool.best_fitness.iter().any(|f| f.len() != self.output_size)
        {
            return Err(SwarmError::Snapshot(
                "fitness column does not match the pool size".to_string(),
            ));
        }
        if self.pool.active.len() != n || self.pool.ranks.len() != n {
            return Err(SwarmError::Snapshot(
                "activity or hierarchy column does not match the pool size".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BoundaryMode, SwarmConfig};
    use crate::swarm::ChickenSwarm;
    use crate::utils::himmelblau;

    fn bits(rows: &[Vec<f64>]) -> Vec<u64> {
        rows.iter().flatten().map(|x| x.to_bits()).collect()
    }

    fn running_swarm() -> ChickenSwarm {
        let bench = himmelblau();
        let config = SwarmConfig::new(4, 8, 4, 6, 30, BoundaryMode::Random).with_seed(31);
        let mut swarm =
            ChickenSwarm::new(bench.problem, config, bench.objective, bench.constraint, None)
                .unwrap();
        for _ in 0..400 {
            swarm.step(true);
            swarm.call_objective(true);
        }
        swarm
    }

    #[test]
    fn json_keeps_every_bit() {
        let state = running_swarm().export_state();
        let parsed = SwarmState::from_json(&state.to_json().unwrap()).unwrap();

        assert_eq!(bits(&parsed.pool.positions), bits(&state.pool.positions));
        assert_eq!(bits(&parsed.pool.velocities), bits(&state.pool.velocities));
        assert_eq!(bits(&parsed.pool.last_valid), bits(&state.pool.last_valid));
        assert_eq!(bits(&parsed.pool.best_positions), bits(&state.pool.best_positions));
        assert_eq!(bits(&parsed.pool.best_fitness), bits(&state.pool.best_fitness));
        assert_eq!(
            bits(&[parsed.tracker.global_best_position.clone()]),
            bits(&[state.tracker.global_best_position.clone()])
        );
        assert_eq!(
            parsed.initial_deviation.to_bits(),
            state.initial_deviation.to_bits()
        );
        parsed.validate().unwrap();
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let mut state = running_swarm().export_state();
        state.pool.velocities[2][0] = f64::NAN;
        assert!(matches!(state.validate(), Err(SwarmError::Snapshot(_))));
    }

    #[test]
    fn missing_cursor_is_rejected() {
        let mut state = running_swarm().export_state();
        state.cursor = state.pool.n_agents;
        assert!(state.validate().is_err());
    }
}
