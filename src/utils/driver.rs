//! Step/evaluate loop for any `Optimizer`.

use crate::swarm::Optimizer;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOptions {
    pub suppress_output: bool,
    /// Passed to every `call_objective`
    pub allow_update: bool,
    /// Record convergence data every N cycles. 0 disables the history.
    pub report_every: u64,
    /// Safety cap on step/evaluate cycles
    pub max_cycles: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            suppress_output: true,
            allow_update: true,
            report_every: 0,
            max_cycles: 10_000_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub iterations: u64,
    pub best_eval: f64,
    pub solution: Vec<f64>,
    pub outputs: Vec<f64>,
    /// `(iteration, best norm)` samples
    pub history: Vec<(u64, f64)>,
    pub cycles: u64,
    pub converged: bool,
}

/// Alternates `step` and `call_objective` until the optimizer reports completion.
pub fn run_to_completion(optimizer: &mut dyn Optimizer, options: &RunOptions) -> Result<RunReport> {
    let mut history = Vec::new();
    let mut cycles = 0u64;

    while !optimizer.complete() {
        if cycles >= options.max_cycles {
            let (iteration, best) = optimizer.get_convergence_data();
            bail!(
                "optimizer did not finish within {} cycles (iteration {}, best {:.3e})",
                options.max_cycles,
                iteration,
                best
            );
        }
        optimizer.step(options.suppress_output);
        if !optimizer.call_objective(options.allow_update) {
            debug!("[Driver] Evaluation skipped at cycle {}", cycles);
        }
        cycles += 1;

        if options.report_every > 0 && cycles % options.report_every == 0 {
            let (iteration, best) = optimizer.get_convergence_data();
            info!("[Driver] Iteration {}: best {:.6e}", iteration, best);
            history.push((iteration, best));
        }
    }

    let (iterations, best_eval) = optimizer.get_convergence_data();
    info!(
        "[Driver] Finished in {} cycles: {} iterations, best {:.6e}",
        cycles, iterations, best_eval
    );
    Ok(RunReport {
        iterations,
        best_eval,
        solution: optimizer.get_optimized_soln(),
        outputs: optimizer.get_optimized_outs(),
        history,
        cycles,
        converged: optimizer.converged(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Halves its error on every committed evaluation
    struct Halving {
        error: f64,
        iteration: u64,
        pending: bool,
    }

    impl Optimizer for Halving {
        fn step(&mut self, _: bool) {
            if self.pending {
                self.error /= 2.0;
                self.pending = false;
            }
        }

        fn call_objective(&mut self, allow_update: bool) -> bool {
            if allow_update {
                self.iteration += 1;
                self.pending = true;
            }
            true
        }

        fn converged(&self) -> bool {
            self.error < 1e-3
        }

        fn maxed(&self) -> bool {
            self.iteration > 100
        }

        fn get_convergence_data(&self) -> (u64, f64) {
            (self.iteration, self.error)
        }

        fn get_optimized_soln(&self) -> Vec<f64> {
            vec![self.error]
        }

        fn get_optimized_outs(&self) -> Vec<f64> {
            vec![self.error]
        }

        fn get_obj_inputs(&self) -> Vec<f64> {
            vec![self.error]
        }
    }

    #[test]
    fn runs_until_converged() {
        let mut opt = Halving { error: 1.0, iteration: 0, pending: false };
        let options = RunOptions { report_every: 1, ..Default::default() };
        let report = run_to_completion(&mut opt, &options).unwrap();
        assert!(report.converged);
        // 2^-10 < 1e-3, committed on the 11th step
        assert_eq!(report.cycles, 11);
        assert_eq!(report.history.len(), 11);
        assert!(report.history.windows(2).all(|w| w[1].1 <= w[0].1));
    }

    #[test]
    fn cycle_cap_is_an_error() {
        let mut opt = Halving { error: 1.0, iteration: 0, pending: false };
        let options = RunOptions { allow_update: false, max_cycles: 50, ..Default::default() };
        let err = run_to_completion(&mut opt, &options).unwrap_err();
        assert!(err.to_string().contains("50 cycles"));
    }
}
