//! Movement Engine
//!
//! Role-specific position updates. Every move records the pre-move position as
//! the agent's last valid position and the displacement as its velocity.

use super::{clipped_exp, EPSILON};
use crate::core::{AgentPool, Role};
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub struct MovementEngine {
    rooster_count: usize,
}

impl MovementEngine {
    pub fn new(rooster_count: usize) -> Self {
        MovementEngine { rooster_count }
    }

    /// Moves `agent` by the rule for its role
    pub fn move_agent<R: Rng + ?Sized>(&self, pool: &mut AgentPool, agent: usize, rng: &mut R) {
        let old = pool.positions[agent].clone();
        let new = match pool.role(agent) {
            Role::Rooster => self.move_rooster(pool, agent, rng),
            Role::Hen | Role::MotherHen => self.move_hen(pool, agent, rng),
            Role::Chick => self.move_chick(pool, agent, rng),
        };
        pool.velocities[agent] = new.iter().zip(&old).map(|(n, o)| n - o).collect();
        pool.last_valid[agent] = old;
        pool.positions[agent] = new;
    }

    /// Scales the position by `1 + N(0, σ²)`, one draw for all dimensions.
    /// σ² is 1 unless a randomly picked rooster is fitter, in which case it
    /// shrinks with the fitness gap.
    fn move_rooster<R: Rng + ?Sized>(&self, pool: &AgentPool, agent: usize, rng: &mut R) -> Vec<f64> {
        let other = rng.gen_range(0..self.rooster_count);
        let f_other = pool.fitness_norm(other);
        let f_self = pool.fitness_norm(agent);

        let sigma_sq = if f_self <= f_other {
            1.0
        } else {
            clipped_exp((f_other - f_self) / (f_self.abs() + EPSILON))
        };

        let Ok(normal) = Normal::new(0.0, sigma_sq) else {
            debug!("[Movement] Rooster {} skipped, bad spread {}", agent, sigma_sq);
            return pool.positions[agent].clone();
        };
        let factor = 1.0 + normal.sample(rng);
        pool.positions[agent].iter().map(|x| x * factor).collect()
    }

    /// Pulls toward the group rooster and a random non-chick flockmate,
    /// weighted by fitness differences.
    fn move_hen<R: Rng + ?Sized>(&self, pool: &AgentPool, agent: usize, rng: &mut R) -> Vec<f64> {
        let rooster = pool.ranks[agent].group;
        let f_self = pool.fitness_norm(agent);
        let f_rooster = pool.fitness_norm(rooster);

        let s1 = clipped_exp((f_self - f_rooster) / (f_self.abs() + EPSILON));
        let r1: f64 = rng.gen();

        let candidates: Vec<usize> = (0..pool.n_agents)
            .filter(|&j| j != rooster && j != agent && pool.role(j) != Role::Chick)
            .collect();
        // a flock of one rooster and one hen has nobody else to follow
        let other = candidates.choose(rng).copied();

        let current = &pool.positions[agent];
        let rooster_pos = &pool.positions[rooster];
        let mut next: Vec<f64> = current
            .iter()
            .zip(rooster_pos)
            .map(|(x, r)| x + s1 * r1 * (r - x))
            .collect();

        if let Some(other) = other {
            let f_other = pool.fitness_norm(other);
            let s2 = clipped_exp(f_other - f_self);
            let r2: f64 = rng.gen();
            for ((n, x), o) in next.iter_mut().zip(current).zip(&pool.positions[other]) {
                *n += s2 * r2 * (o - x);
            }
        }
        next
    }

    /// Either jumps across the gap to its mother (FL = 2) or stays put (FL = 0)
    fn move_chick<R: Rng + ?Sized>(&self, pool: &AgentPool, agent: usize, rng: &mut R) -> Vec<f64> {
        let current = &pool.positions[agent];
        let Some(mother) = pool.ranks[agent].mother else {
            return current.clone();
        };
        let fl = if rng.gen::<bool>() { 2.0 } else { 0.0 };
        current
            .iter()
            .zip(&pool.positions[mother])
            .map(|(x, m)| x + fl * (m - x))
            .collect()
    }
}
