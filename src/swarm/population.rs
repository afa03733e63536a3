//! Population Model
//!
//! Splits the flock into roosters, hens, mother hens and chicks, assigns groups
//! and mother links, and rebuilds the hierarchy from personal-best fitness.

use super::boundary::sample_uniform;
use crate::core::{AgentPool, Constraint, Rank, Role, SwarmError, SwarmResult};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Concrete role counts, reconciled against the population size
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSplit {
    pub roosters: usize,
    /// All hens, mother hens included
    pub hens: usize,
    pub mother_hens: usize,
    pub chicks: usize,
}

impl RoleSplit {
    /// Fits the requested split to `agent_count`.
    ///
    /// A short population takes the shortfall from the hens (mother hens are
    /// capped at the remaining hens); a surplus becomes ordinary hens.
    /// Returns the split and a description of any adjustment.
    pub fn reconcile(
        agent_count: usize,
        roosters: usize,
        hens: usize,
        mother_hens: usize,
        chicks: usize,
    ) -> SwarmResult<(Self, Option<String>)> {
        if agent_count == 0 {
            return Err(SwarmError::config("swarm needs at least one agent"));
        }
        if roosters == 0 {
            return Err(SwarmError::config("swarm needs at least one rooster"));
        }
        if mother_hens > hens {
            return Err(SwarmError::config(format!(
                "there are more mother hens ({}) than total hens ({})",
                mother_hens, hens
            )));
        }

        let requested = roosters + hens + chicks;
        let mut split = RoleSplit {
            roosters,
            hens,
            mother_hens,
            chicks,
        };
        let mut adjustment = None;

        if agent_count < requested {
            if roosters + chicks > agent_count {
                return Err(SwarmError::config(format!(
                    "roosters ({}) and chicks ({}) exceed the swarm size ({})",
                    roosters, chicks, agent_count
                )));
            }
            split.hens = agent_count - roosters - chicks;
            split.mother_hens = mother_hens.min(split.hens);
            adjustment = Some(format!(
                "role counts add up to {} but the swarm has {} agents: using {} hens, {} of them mother hens",
                requested, agent_count, split.hens, split.mother_hens
            ));
        } else if agent_count > requested {
            split.hens += agent_count - requested;
            adjustment = Some(format!(
                "role counts add up to {} but the swarm has {} agents: adding {} ordinary hens",
                requested,
                agent_count,
                agent_count - requested
            ));
        }

        if split.chicks > 0 && split.mother_hens == 0 {
            return Err(SwarmError::config(
                "there are chicks, but no mother hens",
            ));
        }

        Ok((split, adjustment))
    }

    pub fn total(&self) -> usize {
        self.roosters + self.hens + self.chicks
    }

    /// Roles in hierarchy order: roosters, hens, mother hens, chicks
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Vec::with_capacity(self.total());
        roles.extend(std::iter::repeat(Role::Rooster).take(self.roosters));
        roles.extend(std::iter::repeat(Role::Hen).take(self.hens - self.mother_hens));
        roles.extend(std::iter::repeat(Role::MotherHen).take(self.mother_hens));
        roles.extend(std::iter::repeat(Role::Chick).take(self.chicks));
        roles
    }
}

/// Owns the role split and (re)builds the hierarchy over an agent pool
#[derive(Clone, Debug)]
pub struct PopulationModel {
    split: RoleSplit,
}

impl PopulationModel {
    pub fn new(split: RoleSplit) -> Self {
        PopulationModel { split }
    }

    pub fn split(&self) -> RoleSplit {
        self.split
    }

    /// Places every agent uniformly inside the bounds (feasible placements
    /// preferred, up to `max_attempts` draws each) and assigns the hierarchy.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        lower: &[f64],
        upper: &[f64],
        constraint: &dyn Constraint,
        max_attempts: usize,
        rng: &mut R,
    ) -> SwarmResult<()> {
        for agent in 0..pool.n_agents {
            let mut position = sample_uniform(lower, upper, rng);
            let mut attempts = 1;
            while !constraint.is_feasible(&position) && attempts < max_attempts {
                position = sample_uniform(lower, upper, rng);
                attempts += 1;
            }
            if !constraint.is_feasible(&position) {
                warn!(
                    "[Population] No feasible start found for agent {} after {} draws",
                    agent, attempts
                );
            }
            pool.last_valid[agent] = position.clone();
            pool.best_positions[agent] = position.clone();
            pool.positions[agent] = position;
        }
        self.assign_hierarchy(pool, rng)
    }

    /// Sorts the pool best-to-worst by personal-best fitness and rebuilds roles,
    /// groups and mother links over the new order.
    pub fn reorganize<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        rng: &mut R,
    ) -> SwarmResult<()> {
        let order = pool.fitness_order();
        pool.apply_permutation(&order);
        self.assign_hierarchy(pool, rng)?;
        debug!(
            "[Population] Regrouped {} agents, best norm {:.3e}",
            pool.n_agents,
            pool.fitness_norm(0)
        );
        Ok(())
    }

    /// Roosters take groups `0..RN` in order, hens join a random group, chicks
    /// follow a random mother hen placed before them and join her group.
    fn assign_hierarchy<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        rng: &mut R,
    ) -> SwarmResult<()> {
        let roles = self.split.roles();
        if roles.len() != pool.n_agents {
            return Err(SwarmError::config(format!(
                "role split covers {} agents, pool has {}",
                roles.len(),
                pool.n_agents
            )));
        }

        let mut mothers: Vec<usize> = Vec::with_capacity(self.split.mother_hens);
        for (agent, role) in roles.into_iter().enumerate() {
            pool.ranks[agent] = match role {
                Role::Rooster => Rank::rooster(agent),
                Role::Hen | Role::MotherHen => {
                    if role == Role::MotherHen {
                        mothers.push(agent);
                    }
                    Rank {
                        role,
                        group: rng.gen_range(0..self.split.roosters),
                        mother: None,
                    }
                }
                Role::Chick => {
                    let Some(&mother) = mothers.choose(rng) else {
                        return Err(SwarmError::config(
                            "chick placed before any mother hen",
                        ));
                    };
                    Rank {
                        role,
                        group: pool.ranks[mother].group,
                        mother: Some(mother),
                    }
                }
            };
        }
        Ok(())
    }

    /// Checks the hierarchy invariants against this split
    pub fn validate(&self, pool: &AgentPool) -> SwarmResult<()> {
        let expected = self.split.roles();
        if expected.len() != pool.ranks.len() {
            return Err(SwarmError::Snapshot(format!(
                "hierarchy has {} entries, split needs {}",
                pool.ranks.len(),
                expected.len()
            )));
        }
        for (agent, (rank, role)) in pool.ranks.iter().zip(expected).enumerate() {
            if rank.role != role {
                return Err(SwarmError::Snapshot(format!(
                    "agent {} is a {:?}, expected {:?}",
                    agent, rank.role, role
                )));
            }
            let valid = match rank.role {
                Role::Rooster => rank.group == agent && rank.mother.is_none(),
                Role::Hen | Role::MotherHen => {
                    rank.group < self.split.roosters && rank.mother.is_none()
                }
                Role::Chick => match rank.mother {
                    Some(m) => {
                        m < pool.ranks.len()
                            && pool.ranks[m].role == Role::MotherHen
                            && pool.ranks[m].group == rank.group
                    }
                    None => false,
                },
            };
            if !valid {
                return Err(SwarmError::Snapshot(format!(
                    "agent {} has an inconsistent rank {:?}",
                    agent, rank
                )));
            }
        }
        Ok(())
    }
}
