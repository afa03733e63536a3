//! Agent table for the chicken swarm.
//!
//! Struct-of-Arrays layout: one column per per-agent quantity, all indexed by
//! agent. The hierarchy is a small tagged record per agent.

use serde::{Deserialize, Serialize};
use std::mem::swap;

/// Fitness assigned to agents that have never been evaluated.
/// Large but finite, so fitness ratios in the movement rules stay finite.
pub const UNSET_FITNESS: f64 = i64::MAX as f64;

/// Position in the flock hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Rooster,
    Hen,
    MotherHen,
    Chick,
}

impl Role {
    /// Hens and mother hens share the hen movement rule
    pub fn is_hen(self) -> bool {
        matches!(self, Role::Hen | Role::MotherHen)
    }
}

/// Role, group and (for chicks) mother of one agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub role: Role,
    /// Index of the group rooster, in `0..rooster_count`
    pub group: usize,
    /// Agent index of the mother hen; only chicks have one
    pub mother: Option<usize>,
}

impl Rank {
    pub fn rooster(group: usize) -> Self {
        Rank {
            role: Role::Rooster,
            group,
            mother: None,
        }
    }
}

/// All mutable per-agent state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentPool {
    pub n_agents: usize,
    pub dimension: usize,

    pub positions: Vec<Vec<f64>>,
    /// Displacement applied by the last move
    pub velocities: Vec<Vec<f64>>,
    /// Position before the last move, used to revert in reflecting/absorbing modes
    pub last_valid: Vec<Vec<f64>>,

    pub best_positions: Vec<Vec<f64>>,
    pub best_fitness: Vec<Vec<f64>>,

    pub active: Vec<bool>,
    pub ranks: Vec<Rank>,
}

impl AgentPool {
    /// Pool with all agents at the origin, unevaluated, ranked as roosters of group 0.
    /// Positions and ranks are filled in by the population model.
    pub fn new(n_agents: usize, dimension: usize, output_size: usize) -> Self {
        AgentPool {
            n_agents,
            dimension,
            positions: vec![vec![0.0; dimension]; n_agents],
            velocities: vec![vec![0.0; dimension]; n_agents],
            last_valid: vec![vec![0.0; dimension]; n_agents],
            best_positions: vec![vec![0.0; dimension]; n_agents],
            best_fitness: vec![vec![UNSET_FITNESS; output_size]; n_agents],
            active: vec![true; n_agents],
            ranks: vec![Rank::rooster(0); n_agents],
        }
    }

    #[inline]
    pub fn role(&self, agent: usize) -> Role {
        self.ranks[agent].role
    }

    /// L2 norm of the agent's personal-best fitness
    #[inline]
    pub fn fitness_norm(&self, agent: usize) -> f64 {
        l2_norm(&self.best_fitness[agent])
    }

    pub fn count(&self, role: Role) -> usize {
        self.ranks.iter().filter(|r| r.role == role).count()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    /// Indices ordering agents from best to worst personal-best fitness.
    /// Stable, so ties keep their current order.
    pub fn fitness_order(&self) -> Vec<usize> {
        let norms: Vec<f64> = (0..self.n_agents).map(|i| self.fitness_norm(i)).collect();
        let mut indices: Vec<usize> = (0..self.n_agents).collect();
        indices.sort_by(|&a, &b| norms[a].total_cmp(&norms[b]));
        indices
    }

    /// Reorders every per-agent column by `indices` (new slot i takes old agent
    /// `indices[i]`). The new columns are built completely before any is swapped in.
    /// Ranks are not permuted; they are reassigned after a reorder.
    pub fn apply_permutation(&mut self, indices: &[usize]) {
        debug_assert_eq!(indices.len(), self.n_agents);

        let pick = |column: &Vec<Vec<f64>>| -> Vec<Vec<f64>> {
            indices.iter().map(|&old| column[old].clone()).collect()
        };
        let mut new_positions = pick(&self.positions);
        let mut new_velocities = pick(&self.velocities);
        let mut new_last_valid = pick(&self.last_valid);
        let mut new_best_positions = pick(&self.best_positions);
        let mut new_best_fitness = pick(&self.best_fitness);
        let mut new_active: Vec<bool> = indices.iter().map(|&old| self.active[old]).collect();

        swap(&mut self.positions, &mut new_positions);
        swap(&mut self.velocities, &mut new_velocities);
        swap(&mut self.last_valid, &mut new_last_valid);
        swap(&mut self.best_positions, &mut new_best_positions);
        swap(&mut self.best_fitness, &mut new_best_fitness);
        swap(&mut self.active, &mut new_active);
    }

    /// Norm of the per-dimension mean absolute deviation from the population mean
    pub fn absolute_mean_deviation(&self) -> f64 {
        if self.n_agents == 0 {
            return 0.0;
        }
        let n = self.n_agents as f64;
        let mut mean = vec![0.0; self.dimension];
        for pos in &self.positions {
            for (m, x) in mean.iter_mut().zip(pos) {
                *m += x / n;
            }
        }
        let mut deviation = vec![0.0; self.dimension];
        for pos in &self.positions {
            for ((d, x), m) in deviation.iter_mut().zip(pos).zip(&mean) {
                *d += (x - m).abs() / n;
            }
        }
        l2_norm(&deviation)
    }
}

/// Euclidean norm. Accumulates with `hypot` so large finite entries don't overflow.
#[inline]
pub fn l2_norm(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc: f64, v| acc.hypot(*v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_fitness(fitness: &[f64]) -> AgentPool {
        let mut pool = AgentPool::new(fitness.len(), 1, 1);
        for (i, f) in fitness.iter().enumerate() {
            pool.positions[i] = vec![i as f64];
            pool.best_positions[i] = vec![i as f64 * 10.0];
            pool.best_fitness[i] = vec![*f];
            pool.active[i] = i % 2 == 0;
        }
        pool
    }

    #[test]
    fn fitness_order_is_stable() {
        let pool = pool_with_fitness(&[3.0, 1.0, 2.0, 1.0]);
        assert_eq!(pool.fitness_order(), vec![1, 3, 2, 0]);
    }

    #[test]
    fn permutation_moves_columns_together() {
        let mut pool = pool_with_fitness(&[3.0, 1.0, 2.0, 1.0]);
        let order = pool.fitness_order();
        pool.apply_permutation(&order);

        for (slot, old) in order.iter().enumerate() {
            assert_eq!(pool.positions[slot], vec![*old as f64]);
            assert_eq!(pool.best_positions[slot], vec![*old as f64 * 10.0]);
            assert_eq!(pool.active[slot], old % 2 == 0);
        }
        let norms: Vec<f64> = (0..4).map(|i| pool.fitness_norm(i)).collect();
        assert_eq!(norms, vec![1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn unset_fitness_norm_is_finite() {
        let pool = AgentPool::new(2, 3, 4);
        assert!(pool.fitness_norm(0).is_finite());
        assert!(pool.fitness_norm(0) > 1e18);
    }

    #[test]
    fn deviation_of_spread_points() {
        let mut pool = AgentPool::new(2, 2, 1);
        pool.positions[0] = vec![-1.0, 0.0];
        pool.positions[1] = vec![1.0, 0.0];
        assert!((pool.absolute_mean_deviation() - 1.0).abs() < 1e-12);
    }
}
