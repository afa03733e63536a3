//! Boundary Policy
//!
//! Runs after every move. Detects positions that left the search box, break
//! the constraint, or make the objective fail, and recovers per `BoundaryMode`.

use crate::core::{AgentPool, BoundaryMode, Constraint, Objective};
use rand::prelude::*;
use tracing::{debug, warn};

/// Uniform sample inside `[lower, upper]`, drawn per dimension
pub fn sample_uniform<R: Rng + ?Sized>(lower: &[f64], upper: &[f64], rng: &mut R) -> Vec<f64> {
    lower
        .iter()
        .zip(upper)
        .map(|(lo, hi)| lo + rng.gen::<f64>() * (hi - lo))
        .collect()
}

/// Everything needed to judge a position
pub struct Feasibility<'a> {
    pub lower: &'a [f64],
    pub upper: &'a [f64],
    pub constraint: &'a dyn Constraint,
    pub objective: &'a dyn Objective,
    pub output_size: usize,
}

impl<'a> Feasibility<'a> {
    /// Dimensions outside their bounds. Non-finite coordinates always count.
    pub fn violations(&self, position: &[f64]) -> Vec<usize> {
        position
            .iter()
            .zip(self.lower.iter().zip(self.upper))
            .enumerate()
            .filter(|(_, (x, (lo, hi)))| !x.is_finite() || *x < *lo || *x > *hi)
            .map(|(dim, _)| dim)
            .collect()
    }

    pub fn in_bounds(&self, position: &[f64]) -> bool {
        position
            .iter()
            .zip(self.lower.iter().zip(self.upper))
            .all(|(x, (lo, hi))| x.is_finite() && x >= lo && x <= hi)
    }

    /// True when the objective returns a full, finite output vector
    pub fn evaluates(&self, position: &[f64]) -> bool {
        match self.objective.evaluate(position, self.output_size) {
            Some(outputs) => {
                outputs.len() == self.output_size && outputs.iter().all(|v| v.is_finite())
            }
            None => false,
        }
    }

    /// In bounds, feasible, and evaluable (checked in that order)
    pub fn is_usable(&self, position: &[f64]) -> bool {
        self.in_bounds(position)
            && self.constraint.is_feasible(position)
            && self.evaluates(position)
    }
}

/// What the policy did to the agent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryOutcome {
    Accepted,
    /// Replaced by a fresh uniform sample after this many draws
    Resampled(usize),
    Reflected,
    Absorbed,
    /// Put back on its last valid position
    Reverted,
    Deactivated,
}

#[derive(Clone, Copy, Debug)]
pub struct BoundaryPolicy {
    mode: BoundaryMode,
    max_attempts: usize,
}

impl BoundaryPolicy {
    pub fn new(mode: BoundaryMode, max_attempts: usize) -> Self {
        BoundaryPolicy {
            mode,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn mode(&self) -> BoundaryMode {
        self.mode
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        agent: usize,
        check: &Feasibility<'_>,
        rng: &mut R,
    ) -> BoundaryOutcome {
        match self.mode {
            BoundaryMode::Random => {
                if check.is_usable(&pool.positions[agent]) {
                    BoundaryOutcome::Accepted
                } else {
                    self.resample(pool, agent, check, rng)
                }
            }
            BoundaryMode::Reflecting | BoundaryMode::Absorbing => {
                self.rebound(pool, agent, check, rng)
            }
            BoundaryMode::Invisible => {
                if check.is_usable(&pool.positions[agent]) {
                    BoundaryOutcome::Accepted
                } else {
                    pool.active[agent] = false;
                    // a move that overflowed leaves nothing meaningful to freeze at
                    if !is_finite(&pool.positions[agent]) {
                        revert(pool, agent);
                    }
                    debug!("[Boundary] Agent {} left the feasible region, deactivated", agent);
                    BoundaryOutcome::Deactivated
                }
            }
        }
    }

    /// Draws uniform positions until one is usable, up to `max_attempts`.
    /// Falls back to the last valid position when every draw fails.
    fn resample<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        agent: usize,
        check: &Feasibility<'_>,
        rng: &mut R,
    ) -> BoundaryOutcome {
        for attempt in 1..=self.max_attempts {
            let candidate = sample_uniform(check.lower, check.upper, rng);
            if check.is_usable(&candidate) {
                set_position(pool, agent, candidate);
                return BoundaryOutcome::Resampled(attempt);
            }
        }
        warn!(
            "[Boundary] No usable position for agent {} after {} draws, reverting",
            agent, self.max_attempts
        );
        revert(pool, agent);
        BoundaryOutcome::Reverted
    }

    /// Reflecting and absorbing modes. Out-of-bounds but feasible positions go
    /// back to the last valid position, with the violating velocity components
    /// inverted (reflecting) or zeroed (absorbing); the adjusted velocity is then
    /// applied if it lands somewhere usable. Infeasible, unevaluable or
    /// non-finite positions get the random recovery.
    fn rebound<R: Rng + ?Sized>(
        &self,
        pool: &mut AgentPool,
        agent: usize,
        check: &Feasibility<'_>,
        rng: &mut R,
    ) -> BoundaryOutcome {
        let position = &pool.positions[agent];
        if !is_finite(position) {
            return self.resample(pool, agent, check, rng);
        }
        let violations = check.violations(position);
        let feasible = check.constraint.is_feasible(position);

        if violations.is_empty() {
            if feasible && check.evaluates(position) {
                return BoundaryOutcome::Accepted;
            }
            return self.resample(pool, agent, check, rng);
        }
        if !feasible {
            return self.resample(pool, agent, check, rng);
        }

        let mut velocity = pool.velocities[agent].clone();
        for &dim in &violations {
            velocity[dim] = match self.mode {
                BoundaryMode::Reflecting => -velocity[dim],
                _ => 0.0,
            };
        }
        let candidate: Vec<f64> = pool.last_valid[agent]
            .iter()
            .zip(&velocity)
            .map(|(x, v)| x + v)
            .collect();

        if check.is_usable(&candidate) {
            pool.positions[agent] = candidate;
            pool.velocities[agent] = velocity;
            match self.mode {
                BoundaryMode::Reflecting => BoundaryOutcome::Reflected,
                _ => BoundaryOutcome::Absorbed,
            }
        } else {
            pool.positions[agent] = pool.last_valid[agent].clone();
            pool.velocities[agent] = velocity;
            BoundaryOutcome::Reverted
        }
    }
}

fn is_finite(position: &[f64]) -> bool {
    position.iter().all(|x| x.is_finite())
}

fn set_position(pool: &mut AgentPool, agent: usize, position: Vec<f64>) {
    pool.velocities[agent] = position
        .iter()
        .zip(&pool.last_valid[agent])
        .map(|(x, last)| x - last)
        .collect();
    pool.positions[agent] = position;
}

fn revert(pool: &mut AgentPool, agent: usize) {
    pool.positions[agent] = pool.last_valid[agent].clone();
    pool.velocities[agent].iter_mut().for_each(|v| *v = 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Unconstrained;
    use rand::rngs::StdRng;

    fn sum_objective(x: &[f64], _: usize) -> Option<Vec<f64>> {
        Some(vec![x.iter().sum()])
    }

    fn unit_box() -> (Vec<f64>, Vec<f64>) {
        (vec![0.0, 0.0], vec![1.0, 1.0])
    }

    /// One agent that moved from `last` by `velocity`
    fn moved_pool(last: [f64; 2], velocity: [f64; 2]) -> AgentPool {
        let mut pool = AgentPool::new(1, 2, 1);
        pool.last_valid[0] = last.to_vec();
        pool.velocities[0] = velocity.to_vec();
        pool.positions[0] = vec![last[0] + velocity[0], last[1] + velocity[1]];
        pool
    }

    #[test]
    fn violations_are_per_dimension() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        assert!(check.violations(&[0.5, 0.5]).is_empty());
        assert_eq!(check.violations(&[-0.1, 0.5]), vec![0]);
        assert_eq!(check.violations(&[0.5, 1.1]), vec![1]);
        assert_eq!(check.violations(&[f64::NAN, 2.0]), vec![0, 1]);
        assert!(check.in_bounds(&[0.0, 1.0]));
        assert!(!check.in_bounds(&[f64::INFINITY, 0.5]));
    }

    #[test]
    fn random_mode_resamples_inside_bounds() {
        let (lo, hi) = unit_box();
        let constraint = |x: &[f64]| x[0] > 0.5;
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &constraint,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Random, 1000);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let mut pool = moved_pool([0.9, 0.5], [0.5, 0.0]);
            let outcome = policy.apply(&mut pool, 0, &check, &mut rng);
            assert!(matches!(outcome, BoundaryOutcome::Resampled(_)));
            assert!(check.in_bounds(&pool.positions[0]));
            assert!(pool.positions[0][0] > 0.5);
        }

        let mut pool = moved_pool([0.6, 0.5], [0.1, 0.1]);
        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Accepted);
        assert!((pool.positions[0][0] - 0.7).abs() < 1e-12);
        assert!((pool.positions[0][1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn random_mode_gives_up_on_impossible_constraint() {
        let (lo, hi) = unit_box();
        let never = |_: &[f64]| false;
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &never,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Random, 25);
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = moved_pool([0.2, 0.3], [5.0, 0.0]);

        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Reverted);
        assert_eq!(pool.positions[0], vec![0.2, 0.3]);
        assert_eq!(pool.velocities[0], vec![0.0, 0.0]);
    }

    #[test]
    fn failing_objective_triggers_recovery() {
        let (lo, hi) = unit_box();
        // only the upper-right quadrant evaluates
        let picky = |x: &[f64], _: usize| {
            if x[0] > 0.5 && x[1] > 0.5 {
                Some(vec![0.0])
            } else {
                None
            }
        };
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &picky,
            output_size: 1,
        };
        let mut rng = StdRng::seed_from_u64(9);

        let random = BoundaryPolicy::new(BoundaryMode::Random, 1000);
        let mut pool = moved_pool([0.9, 0.9], [-0.8, 0.0]);
        assert!(matches!(
            random.apply(&mut pool, 0, &check, &mut rng),
            BoundaryOutcome::Resampled(_)
        ));
        assert!(pool.positions[0].iter().all(|x| *x > 0.5));

        let invisible = BoundaryPolicy::new(BoundaryMode::Invisible, 1000);
        let mut pool = moved_pool([0.9, 0.9], [-0.8, 0.0]);
        assert_eq!(
            invisible.apply(&mut pool, 0, &check, &mut rng),
            BoundaryOutcome::Deactivated
        );
        assert!(!pool.active[0]);
        // stays where it landed
        assert!((pool.positions[0][0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn overflowed_move_deactivates_at_last_valid_position() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Invisible, 10);
        let mut rng = StdRng::seed_from_u64(6);
        let mut pool = moved_pool([0.3, 0.4], [0.0, 0.0]);
        pool.positions[0] = vec![f64::NAN, f64::INFINITY];
        pool.velocities[0] = vec![f64::NAN, f64::INFINITY];

        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Deactivated);
        assert!(!pool.active[0]);
        assert_eq!(pool.positions[0], vec![0.3, 0.4]);
        assert_eq!(pool.velocities[0], vec![0.0, 0.0]);
    }

    #[test]
    fn overflowed_move_is_resampled_in_rebound_modes() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        let mut rng = StdRng::seed_from_u64(12);
        for mode in [BoundaryMode::Reflecting, BoundaryMode::Absorbing] {
            let policy = BoundaryPolicy::new(mode, 100);
            let mut pool = moved_pool([0.3, 0.4], [0.0, 0.0]);
            pool.positions[0] = vec![f64::INFINITY, 0.5];
            pool.velocities[0] = vec![f64::INFINITY, 0.1];

            assert!(matches!(
                policy.apply(&mut pool, 0, &check, &mut rng),
                BoundaryOutcome::Resampled(_)
            ));
            assert!(check.is_usable(&pool.positions[0]));
            assert!(pool.velocities[0].iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn reflecting_inverts_violating_component() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Reflecting, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = moved_pool([0.8, 0.5], [0.4, 0.1]);

        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Reflected);
        assert_eq!(pool.velocities[0], vec![-0.4, 0.1]);
        assert!((pool.positions[0][0] - 0.4).abs() < 1e-12);
        assert!((pool.positions[0][1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn absorbing_zeroes_violating_component() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Absorbing, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let mut pool = moved_pool([0.8, 0.5], [0.4, 0.1]);

        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Absorbed);
        assert_eq!(pool.velocities[0], vec![0.0, 0.1]);
        assert!((pool.positions[0][0] - 0.8).abs() < 1e-12);
        assert!((pool.positions[0][1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn reflection_that_still_escapes_reverts() {
        let (lo, hi) = unit_box();
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &Unconstrained,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Reflecting, 10);
        let mut rng = StdRng::seed_from_u64(0);
        // reflected step lands at 0.5 - 3.0, still outside
        let mut pool = moved_pool([0.5, 0.5], [3.0, 0.0]);

        assert_eq!(policy.apply(&mut pool, 0, &check, &mut rng), BoundaryOutcome::Reverted);
        assert_eq!(pool.positions[0], vec![0.5, 0.5]);
    }

    #[test]
    fn rebound_modes_use_random_recovery_when_infeasible() {
        let (lo, hi) = unit_box();
        let constraint = |x: &[f64]| x[1] < 0.7;
        let check = Feasibility {
            lower: &lo,
            upper: &hi,
            constraint: &constraint,
            objective: &sum_objective,
            output_size: 1,
        };
        let policy = BoundaryPolicy::new(BoundaryMode::Absorbing, 1000);
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = moved_pool([0.5, 0.5], [0.0, 0.3]);

        assert!(matches!(
            policy.apply(&mut pool, 0, &check, &mut rng),
            BoundaryOutcome::Resampled(_)
        ));
        assert!(check.is_usable(&pool.positions[0]));
    }
}
