pub mod benchmark;
pub mod driver;

pub use benchmark::{himmelblau, lundquist_3_var, BenchmarkProblem};
pub use driver::{run_to_completion, RunOptions, RunReport};
