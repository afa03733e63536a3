//! Convergence Tracker
//!
//! Global and personal best bookkeeping plus the termination tests.

use crate::core::{l2_norm, AgentPool, UNSET_FITNESS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    pub global_best_position: Vec<f64>,
    pub global_best_fitness: Vec<f64>,
    pub tolerance: f64,
    pub max_iterations: u64,
    /// Committed objective evaluations so far
    pub iteration: u64,
    /// Set when the population can no longer make progress
    pub stalled: bool,
}

impl ConvergenceTracker {
    pub fn new(
        initial_position: Vec<f64>,
        output_size: usize,
        tolerance: f64,
        max_iterations: u64,
    ) -> Self {
        ConvergenceTracker {
            global_best_position: initial_position,
            global_best_fitness: vec![UNSET_FITNESS; output_size],
            tolerance,
            max_iterations,
            iteration: 0,
            stalled: false,
        }
    }

    /// Compares `fitness` (measured at the agent's current position) against the
    /// global best and the agent's personal best, updating each independently.
    /// Returns `(global_improved, personal_improved)`.
    pub fn record_if_best(
        &mut self,
        pool: &mut AgentPool,
        fitness: &[f64],
        agent: usize,
    ) -> (bool, bool) {
        let norm = l2_norm(fitness);

        let global = norm < self.best_norm();
        if global {
            self.global_best_fitness = fitness.to_vec();
            self.global_best_position = pool.positions[agent].clone();
        }

        let personal = norm < pool.fitness_norm(agent);
        if personal {
            pool.best_fitness[agent] = fitness.to_vec();
            pool.best_positions[agent] = pool.positions[agent].clone();
        }

        (global, personal)
    }

    pub fn best_norm(&self) -> f64 {
        l2_norm(&self.global_best_fitness)
    }

    pub fn converged(&self) -> bool {
        self.best_norm() < self.tolerance
    }

    pub fn maxed(&self) -> bool {
        self.iteration > self.max_iterations || self.stalled
    }

    pub fn complete(&self) -> bool {
        self.converged() || self.maxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_and_personal_update_independently() {
        let mut pool = AgentPool::new(2, 1, 1);
        pool.positions[0] = vec![1.0];
        pool.positions[1] = vec![2.0];
        let mut tracker = ConvergenceTracker::new(vec![0.0], 1, 1e-6, 100);

        assert_eq!(tracker.record_if_best(&mut pool, &[0.5], 0), (true, true));
        assert_eq!(tracker.global_best_position, vec![1.0]);

        // worse than global, but agent 1 has never been evaluated
        assert_eq!(tracker.record_if_best(&mut pool, &[0.8], 1), (false, true));
        assert_eq!(pool.best_fitness[1], vec![0.8]);
        assert_eq!(pool.best_positions[1], vec![2.0]);
        assert_eq!(tracker.global_best_fitness, vec![0.5]);

        // worse than agent 0's own best
        pool.positions[0] = vec![3.0];
        assert_eq!(tracker.record_if_best(&mut pool, &[0.9], 0), (false, false));
        assert_eq!(pool.best_positions[0], vec![1.0]);
    }

    #[test]
    fn multi_objective_uses_norm() {
        let mut pool = AgentPool::new(1, 1, 2);
        let mut tracker = ConvergenceTracker::new(vec![0.0], 2, 1e-6, 100);
        tracker.record_if_best(&mut pool, &[3.0, 4.0], 0);
        assert!((tracker.best_norm() - 5.0).abs() < 1e-12);
        // 4.9 < 5 even though one component grew
        assert!(tracker.record_if_best(&mut pool, &[4.9, 0.0], 0).0);
    }

    #[test]
    fn termination() {
        let mut pool = AgentPool::new(1, 1, 1);
        let mut tracker = ConvergenceTracker::new(vec![0.0], 1, 1e-3, 10);
        assert!(!tracker.complete());

        tracker.iteration = 10;
        assert!(!tracker.maxed());
        tracker.iteration = 11;
        assert!(tracker.maxed() && tracker.complete());

        tracker.iteration = 0;
        tracker.record_if_best(&mut pool, &[1e-4], 0);
        assert!(tracker.converged());

        let mut idle = ConvergenceTracker::new(vec![0.0], 1, 1e-3, 10);
        idle.stalled = true;
        assert!(idle.maxed() && !idle.converged());
    }
}
