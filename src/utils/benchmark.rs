//! Reference problems for exercising the optimizer end to end.

use crate::core::ProblemConfig;
use tracing::info;

pub type ObjectiveFn = fn(&[f64], usize) -> Option<Vec<f64>>;
pub type ConstraintFn = fn(&[f64]) -> bool;

/// A named test problem with a known optimum
#[derive(Clone)]
pub struct BenchmarkProblem {
    pub name: &'static str,
    pub problem: ProblemConfig,
    pub objective: ObjectiveFn,
    pub constraint: ConstraintFn,
    /// One known global minimizer
    pub optimum: Vec<f64>,
}

impl BenchmarkProblem {
    /// Distance from `solution` to the known minimizer
    pub fn error(&self, solution: &[f64]) -> f64 {
        crate::core::l2_norm(
            &solution
                .iter()
                .zip(&self.optimum)
                .map(|(x, o)| x - o)
                .collect::<Vec<_>>(),
        )
    }

    pub fn log_result(&self, solution: &[f64], iterations: u64, best: f64) {
        info!(
            "[Benchmark] {}: best {:.3e} after {} iterations at {:?} (distance to optimum {:.3e})",
            self.name,
            best,
            iterations,
            solution,
            self.error(solution)
        );
    }
}

fn unconstrained(_: &[f64]) -> bool {
    true
}

fn finite(outputs: Vec<f64>) -> Option<Vec<f64>> {
    outputs.iter().all(|v| v.is_finite()).then_some(outputs)
}

/// `(x² + y − 11)² + (x + y² − 7)²` on `[-5, 5]²`. Four minima, all zero.
pub fn himmelblau() -> BenchmarkProblem {
    fn objective(x: &[f64], _: usize) -> Option<Vec<f64>> {
        let (a, b) = (x[0], x[1]);
        finite(vec![(a * a + b - 11.0).powi(2) + (a + b * b - 7.0).powi(2)])
    }

    BenchmarkProblem {
        name: "himmelblau",
        problem: ProblemConfig::new(vec![-5.0, -5.0], vec![5.0, 5.0], vec![0.0], 1e-6, 4000),
        objective,
        constraint: unconstrained,
        optimum: vec![3.0, 2.0],
    }
}

/// Two-output, three-variable problem with a linear coupling constraint
/// `0.1 <= x₂ <= x₀ / 2`. Minimized at `(0.5, 0.1, 0.2)`.
pub fn lundquist_3_var() -> BenchmarkProblem {
    fn objective(x: &[f64], _: usize) -> Option<Vec<f64>> {
        finite(vec![
            (x[0] - 0.5).powi(2) + (x[1] - 0.1).powi(2),
            (x[2] - 0.2).powi(4),
        ])
    }

    fn constraint(x: &[f64]) -> bool {
        x[2] <= x[0] / 2.0 && x[2] >= 0.1
    }

    BenchmarkProblem {
        name: "lundquist_3_var",
        problem: ProblemConfig::new(
            vec![0.21, 0.0, 0.1],
            vec![1.0, 1.0, 0.5],
            vec![0.0, 0.0],
            1e-6,
            3000,
        ),
        objective,
        constraint,
        optimum: vec![0.5, 0.1, 0.2],
    }
}
