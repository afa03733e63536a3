//! Chicken Swarm Engine
//!
//! Drives the flock one agent at a time through a two-phase protocol:
//! `step` moves the agent under the cursor, `call_objective` evaluates it.
//! Every `regroup_interval` committed evaluations the hierarchy is rebuilt.

use super::boundary::{BoundaryOutcome, BoundaryPolicy, Feasibility};
use super::movement::MovementEngine;
use super::optimizer::Optimizer;
use super::population::{PopulationModel, RoleSplit};
use super::snapshot::SwarmState;
use super::tracker::ConvergenceTracker;
use crate::core::{
    AgentPool, Constraint, Objective, ProblemConfig, SwarmConfig, SwarmError, SwarmLogger,
    SwarmResult, TracingLogger,
};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Which half of the protocol the swarm expects next.
///
/// Informational: calls out of order are logged at debug level and otherwise
/// accepted, so a host may evaluate the first agent before any step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPhase {
    AwaitingMove,
    AwaitingEvaluation,
}

pub struct ChickenSwarm {
    problem: ProblemConfig,
    config: SwarmConfig,

    pool: AgentPool,
    population: PopulationModel,
    movement: MovementEngine,
    boundary: BoundaryPolicy,
    tracker: ConvergenceTracker,

    objective: Box<dyn Objective>,
    constraint: Box<dyn Constraint>,
    logger: Arc<dyn SwarmLogger>,
    rng: StdRng,

    cursor: usize,
    phase: StepPhase,
    /// Set by the last successful evaluation made with updates allowed
    allow_update: bool,
    /// Fitness of the agent under the cursor, waiting to be committed
    pending_fitness: Option<Vec<f64>>,
    last_outputs: Vec<f64>,
    last_fitness: Vec<f64>,
    last_regroup: u64,
    idle_steps: usize,
    failed_evaluations: usize,
    completion_reported: bool,
    initial_deviation: f64,
}

impl ChickenSwarm {
    /// Builds and randomly places the flock.
    ///
    /// Configuration errors are reported through the logger (the tracing logger
    /// when none is given) and returned.
    pub fn new<O, C>(
        problem: ProblemConfig,
        config: SwarmConfig,
        objective: O,
        constraint: C,
        logger: Option<Arc<dyn SwarmLogger>>,
    ) -> SwarmResult<Self>
    where
        O: Objective + 'static,
        C: Constraint + 'static,
    {
        let logger = logger.unwrap_or_else(|| Arc::new(TracingLogger));
        match Self::build(
            problem,
            config,
            Box::new(objective),
            Box::new(constraint),
            logger.clone(),
        ) {
            Ok(swarm) => Ok(swarm),
            Err(e) => {
                error!("[ChickenSwarm] Initialization failed: {}", e);
                logger.log_message(&format!("ERROR: {}. Swarm init failed.", e));
                Err(e)
            }
        }
    }

    fn build(
        mut problem: ProblemConfig,
        config: SwarmConfig,
        objective: Box<dyn Objective>,
        constraint: Box<dyn Constraint>,
        logger: Arc<dyn SwarmLogger>,
    ) -> SwarmResult<Self> {
        problem.validate()?;
        if config.regroup_interval == 0 {
            return Err(SwarmError::config("regroup interval must be at least 1"));
        }

        let (split, adjustment) = RoleSplit::reconcile(
            config.population_size(),
            config.rooster_count,
            config.hen_count,
            config.mother_hen_count,
            config.chick_count,
        )?;
        if let Some(note) = adjustment {
            warn!("[ChickenSwarm] {}", note);
            logger.log_message(&format!("WARNING: {}", note));
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n_agents = split.total();
        let mut pool = AgentPool::new(n_agents, problem.dimension(), problem.output_size);
        let population = PopulationModel::new(split);
        population.initialize(
            &mut pool,
            &problem.lower_bounds,
            &problem.upper_bounds,
            constraint.as_ref(),
            config.max_resample_attempts,
            &mut rng,
        )?;

        let tracker = ConvergenceTracker::new(
            pool.positions[0].clone(),
            problem.output_size,
            problem.tolerance,
            problem.max_iterations,
        );
        let initial_deviation = pool.absolute_mean_deviation();

        info!(
            "[ChickenSwarm] Initialized {} agents ({} roosters, {} hens, {} mother hens, {} chicks), dim={}, boundary={:?}",
            n_agents,
            split.roosters,
            split.hens - split.mother_hens,
            split.mother_hens,
            split.chicks,
            problem.dimension(),
            config.boundary
        );
        logger.log_message("swarm successfully initialized");

        Ok(ChickenSwarm {
            last_outputs: vec![0.0; problem.output_size],
            last_fitness: vec![0.0; problem.output_size],
            movement: MovementEngine::new(split.roosters),
            boundary: BoundaryPolicy::new(config.boundary, config.max_resample_attempts),
            problem,
            config,
            pool,
            population,
            tracker,
            objective,
            constraint,
            logger,
            rng,
            cursor: 0,
            phase: StepPhase::AwaitingMove,
            allow_update: false,
            pending_fitness: None,
            last_regroup: 0,
            idle_steps: 0,
            failed_evaluations: 0,
            completion_reported: false,
            initial_deviation,
        })
    }

    /// Advances the agent under the cursor.
    ///
    /// Commits the fitness from the last evaluation, regroups when due, moves the
    /// agent by its role rule and applies the boundary policy, then moves the
    /// cursor on. Does nothing until a first evaluation has allowed updates.
    pub fn step(&mut self, suppress_output: bool) {
        if self.phase == StepPhase::AwaitingEvaluation {
            debug!(
                "[ChickenSwarm] step called twice without an evaluation, agent {} moves unevaluated",
                self.cursor
            );
        }
        if !suppress_output {
            self.report_step();
        }
        if !self.allow_update {
            self.phase = StepPhase::AwaitingEvaluation;
            return;
        }

        if self.pool.active[self.cursor] {
            self.idle_steps = 0;
            if let Some(fitness) = self.pending_fitness.take() {
                let (global, _) =
                    self.tracker
                        .record_if_best(&mut self.pool, &fitness, self.cursor);
                if global {
                    debug!(
                        "[ChickenSwarm] New best {:.6e} at iteration {}",
                        self.tracker.best_norm(),
                        self.tracker.iteration
                    );
                }
            }

            let iteration = self.tracker.iteration;
            if iteration > 0
                && iteration % self.config.regroup_interval == 0
                && iteration != self.last_regroup
            {
                self.last_regroup = iteration;
                self.regroup();
            }

            if self.pool.active[self.cursor] {
                self.move_current();
            }
        } else {
            self.pending_fitness = None;
            self.idle_steps += 1;
            self.check_stalled();
        }

        self.cursor += 1;
        if self.cursor == self.pool.n_agents {
            self.cursor = 0;
        }
        self.phase = StepPhase::AwaitingEvaluation;

        if self.complete() && !self.completion_reported {
            self.completion_reported = true;
            self.report_completion(suppress_output);
        }
    }

    /// Evaluates the agent under the cursor.
    ///
    /// On success the raw outputs are kept; with `allow_update` the weighted
    /// distance to the targets becomes the pending fitness and the iteration
    /// counter advances. Returns false for failed evaluations and inactive agents.
    pub fn call_objective(&mut self, allow_update: bool) -> bool {
        if self.phase == StepPhase::AwaitingMove && self.tracker.iteration > 0 {
            debug!(
                "[ChickenSwarm] call_objective called twice without a step, agent {} re-evaluated",
                self.cursor
            );
        }
        self.phase = StepPhase::AwaitingMove;
        let agent = self.cursor;
        if !self.pool.active[agent] {
            return false;
        }

        let outputs = match self
            .objective
            .evaluate(&self.pool.positions[agent], self.problem.output_size)
        {
            Some(outputs)
                if outputs.len() == self.problem.output_size
                    && outputs.iter().all(|v| v.is_finite()) =>
            {
                outputs
            }
            _ => {
                debug!(
                    "[ChickenSwarm] Objective failed for agent {} at {:?}",
                    agent, self.pool.positions[agent]
                );
                self.pending_fitness = None;
                self.failed_evaluations += 1;
                self.check_stalled();
                return false;
            }
        };
        self.failed_evaluations = 0;

        if allow_update {
            let fitness: Vec<f64> = outputs
                .iter()
                .zip(&self.problem.targets)
                .zip(&self.problem.weights)
                .map(|((out, target), weight)| weight * (target - out).abs())
                .collect();
            self.tracker.iteration += 1;
            self.allow_update = true;
            self.last_fitness = fitness.clone();
            self.pending_fitness = Some(fitness);
        } else {
            self.allow_update = false;
            self.pending_fitness = None;
        }
        self.last_outputs = outputs;
        true
    }

    pub fn converged(&self) -> bool {
        self.tracker.converged()
    }

    /// Iteration budget exhausted, or the population stalled
    pub fn maxed(&self) -> bool {
        self.tracker.maxed()
    }

    pub fn complete(&self) -> bool {
        self.tracker.complete()
    }

    pub fn stalled(&self) -> bool {
        self.tracker.stalled
    }

    pub fn get_convergence_data(&self) -> (u64, f64) {
        (self.tracker.iteration, self.tracker.best_norm())
    }

    pub fn get_optimized_soln(&self) -> &[f64] {
        &self.tracker.global_best_position
    }

    pub fn get_optimized_outs(&self) -> &[f64] {
        &self.tracker.global_best_fitness
    }

    pub fn get_obj_inputs(&self) -> &[f64] {
        &self.pool.positions[self.cursor]
    }

    /// Raw objective outputs from the last successful evaluation
    pub fn last_outputs(&self) -> &[f64] {
        &self.last_outputs
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn population(&self) -> &AgentPool {
        &self.pool
    }

    pub fn role_split(&self) -> RoleSplit {
        self.population.split()
    }

    pub fn absolute_mean_deviation(&self) -> f64 {
        self.pool.absolute_mean_deviation()
    }

    pub fn initial_deviation(&self) -> f64 {
        self.initial_deviation
    }

    /// Copies out everything needed to resume this run
    pub fn export_state(&self) -> SwarmState {
        SwarmState {
            lower_bounds: self.problem.lower_bounds.clone(),
            upper_bounds: self.problem.upper_bounds.clone(),
            weights: self.problem.weights.clone(),
            targets: self.problem.targets.clone(),
            output_size: self.problem.output_size,
            split: self.population.split(),
            regroup_interval: self.config.regroup_interval,
            boundary: self.boundary.mode(),
            pool: self.pool.clone(),
            tracker: self.tracker.clone(),
            cursor: self.cursor,
            allow_update: self.allow_update,
            pending_fitness: self.pending_fitness.clone(),
            last_outputs: self.last_outputs.clone(),
            last_fitness: self.last_fitness.clone(),
            last_regroup: self.last_regroup,
            idle_steps: self.idle_steps,
            failed_evaluations: self.failed_evaluations,
            initial_deviation: self.initial_deviation,
        }
    }

    /// Replaces all mutable state with `state` and swaps in `objective`.
    /// The constraint and logger are kept. Nothing changes if the snapshot is invalid.
    pub fn import_state<O>(&mut self, state: SwarmState, objective: O) -> SwarmResult<()>
    where
        O: Objective + 'static,
    {
        state.validate()?;
        let population = PopulationModel::new(state.split);
        population.validate(&state.pool)?;

        self.problem.lower_bounds = state.lower_bounds;
        self.problem.upper_bounds = state.upper_bounds;
        self.problem.weights = state.weights;
        self.problem.targets = state.targets;
        self.problem.output_size = state.output_size;
        self.problem.tolerance = state.tracker.tolerance;
        self.problem.max_iterations = state.tracker.max_iterations;

        self.config.regroup_interval = state.regroup_interval;
        self.config.boundary = state.boundary;
        self.config.rooster_count = state.split.roosters;
        self.config.hen_count = state.split.hens;
        self.config.mother_hen_count = state.split.mother_hens;
        self.config.chick_count = state.split.chicks;
        self.config.agent_count = Some(state.split.total());

        self.movement = MovementEngine::new(state.split.roosters);
        self.boundary = BoundaryPolicy::new(state.boundary, self.config.max_resample_attempts);
        self.population = population;
        self.pool = state.pool;
        self.tracker = state.tracker;
        self.cursor = state.cursor;
        self.allow_update = state.allow_update;
        self.pending_fitness = state.pending_fitness;
        self.last_outputs = state.last_outputs;
        self.last_fitness = state.last_fitness;
        self.last_regroup = state.last_regroup;
        self.idle_steps = state.idle_steps;
        self.failed_evaluations = state.failed_evaluations;
        self.initial_deviation = state.initial_deviation;
        self.completion_reported = self.tracker.complete();
        self.phase = StepPhase::AwaitingMove;
        self.objective = Box::new(objective);
        self.rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ self.tracker.iteration),
            None => StdRng::from_entropy(),
        };

        info!(
            "[ChickenSwarm] Imported state at iteration {} (best {:.6e})",
            self.tracker.iteration,
            self.tracker.best_norm()
        );
        Ok(())
    }

    fn regroup(&mut self) {
        match self.population.reorganize(&mut self.pool, &mut self.rng) {
            Ok(()) => {
                info!(
                    "[ChickenSwarm] Regrouped at iteration {}, best {:.6e}",
                    self.tracker.iteration,
                    self.tracker.best_norm()
                );
            }
            Err(e) => {
                error!("[ChickenSwarm] Regroup failed: {}", e);
                self.logger.log_message(&format!("ERROR: regroup failed: {}", e));
            }
        }
        // restart the sweep from the new best rooster
        self.cursor = 0;
    }

    fn move_current(&mut self) {
        let agent = self.cursor;
        self.movement.move_agent(&mut self.pool, agent, &mut self.rng);

        let check = Feasibility {
            lower: &self.problem.lower_bounds,
            upper: &self.problem.upper_bounds,
            constraint: self.constraint.as_ref(),
            objective: self.objective.as_ref(),
            output_size: self.problem.output_size,
        };
        let outcome = self.boundary.apply(&mut self.pool, agent, &check, &mut self.rng);

        if self.config.verbose {
            match outcome {
                BoundaryOutcome::Accepted => {}
                BoundaryOutcome::Reverted => self.logger.log_message(&format!(
                    "WARNING: agent {} could not be recovered, returned to its last valid position",
                    agent
                )),
                BoundaryOutcome::Deactivated => self.logger.log_message(&format!(
                    "WARNING: agent {} left the feasible region and was deactivated at {:?}",
                    agent, self.pool.positions[agent]
                )),
                other => self
                    .logger
                    .log_message(&format!("agent {} boundary recovery: {:?}", agent, other)),
            }
        }
    }

    /// Marks the run stalled once a whole number of sweeps (`max_idle_sweeps`)
    /// pass without an active agent or a successful evaluation.
    fn check_stalled(&mut self) {
        if self.tracker.stalled {
            return;
        }
        let limit = self.pool.n_agents * self.config.max_idle_sweeps.max(1);
        if self.idle_steps >= limit || self.failed_evaluations >= limit {
            self.tracker.stalled = true;
            warn!(
                "[ChickenSwarm] Stalled at iteration {}: {} of {} agents active, {} failed evaluations in a row",
                self.tracker.iteration,
                self.pool.active_count(),
                self.pool.n_agents,
                self.failed_evaluations
            );
            self.logger.log_message(&format!(
                "WARNING: swarm stalled at iteration {} with {} active agents",
                self.tracker.iteration,
                self.pool.active_count()
            ));
        }
    }

    fn report_step(&self) {
        let agent = self.cursor;
        let msg = format!(
            "\n-----------------------------\n\
             STEP #{}\n\
             -----------------------------\n\
             Current Particle:\n{}\n\
             Current Particle Active\n{}\n\
             Current Particle Location\n{:?}\n\
             Absolute mean deviation\n{}\n\
             Initial deviation\n{}\n\
             -----------------------------",
            self.tracker.iteration,
            agent,
            self.pool.active[agent],
            self.pool.positions[agent],
            self.pool.absolute_mean_deviation(),
            self.initial_deviation
        );
        self.logger.log_message(&msg);
    }

    fn report_completion(&self, suppress_output: bool) {
        info!(
            "[ChickenSwarm] Complete after {} iterations: best {:.6e} (converged={}, stalled={})",
            self.tracker.iteration,
            self.tracker.best_norm(),
            self.converged(),
            self.tracker.stalled
        );
        if suppress_output {
            return;
        }
        let msg = format!(
            "\nPoints: \n{:?}\nIterations: \n{}\nFlist: \n{:?}\nNorm Flist: \n{}\n",
            self.tracker.global_best_position,
            self.tracker.iteration,
            self.tracker.global_best_fitness,
            self.tracker.best_norm()
        );
        self.logger.log_message(&msg);
    }
}

impl Optimizer for ChickenSwarm {
    fn step(&mut self, suppress_output: bool) {
        ChickenSwarm::step(self, suppress_output)
    }

    fn call_objective(&mut self, allow_update: bool) -> bool {
        ChickenSwarm::call_objective(self, allow_update)
    }

    fn converged(&self) -> bool {
        ChickenSwarm::converged(self)
    }

    fn maxed(&self) -> bool {
        ChickenSwarm::maxed(self)
    }

    fn complete(&self) -> bool {
        ChickenSwarm::complete(self)
    }

    fn get_convergence_data(&self) -> (u64, f64) {
        ChickenSwarm::get_convergence_data(self)
    }

    fn get_optimized_soln(&self) -> Vec<f64> {
        ChickenSwarm::get_optimized_soln(self).to_vec()
    }

    fn get_optimized_outs(&self) -> Vec<f64> {
        ChickenSwarm::get_optimized_outs(self).to_vec()
    }

    fn get_obj_inputs(&self) -> Vec<f64> {
        ChickenSwarm::get_obj_inputs(self).to_vec()
    }
}
