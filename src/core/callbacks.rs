//! Collaborator seams: objective, constraint and logger.
//!
//! The swarm never evaluates anything itself. Problem-specific code plugs in
//! through these traits; plain closures implement them directly.

use parking_lot::Mutex;
use tracing::info;

/// Objective function evaluated on a candidate position.
///
/// Returns `None` on any numeric failure (overflow, domain error). Must not panic.
pub trait Objective: Send + Sync {
    fn evaluate(&self, position: &[f64], output_size: usize) -> Option<Vec<f64>>;
}

impl<F> Objective for F
where
    F: Fn(&[f64], usize) -> Option<Vec<f64>> + Send + Sync,
{
    fn evaluate(&self, position: &[f64], output_size: usize) -> Option<Vec<f64>> {
        self(position, output_size)
    }
}

/// Feasibility predicate. May be called many times per position.
pub trait Constraint: Send + Sync {
    fn is_feasible(&self, position: &[f64]) -> bool;
}

impl<F> Constraint for F
where
    F: Fn(&[f64]) -> bool + Send + Sync,
{
    fn is_feasible(&self, position: &[f64]) -> bool {
        self(position)
    }
}

/// Accepts every position
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconstrained;

impl Constraint for Unconstrained {
    fn is_feasible(&self, _position: &[f64]) -> bool {
        true
    }
}

/// Receives user-facing reports (configuration errors, step and final reports).
pub trait SwarmLogger: Send + Sync {
    fn log_message(&self, message: &str);
}

/// Default logger, forwards to `tracing`. Nothing is printed until a
/// subscriber is installed, e.g. with `setup_logging`; use `StdoutLogger` to
/// print without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl SwarmLogger for TracingLogger {
    fn log_message(&self, message: &str) {
        info!("{}", message);
    }
}

/// Plain standard output
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutLogger;

impl SwarmLogger for StdoutLogger {
    fn log_message(&self, message: &str) {
        println!("{}", message);
    }
}

/// Keeps every message in memory, for a host application that drains them later.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    messages: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}

impl SwarmLogger for MemoryLogger {
    fn log_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_collaborators() {
        let sphere = |x: &[f64], _: usize| Some(vec![x.iter().map(|v| v * v).sum::<f64>()]);
        assert_eq!(sphere.evaluate(&[1.0, 2.0], 1), Some(vec![5.0]));

        let positive = |x: &[f64]| x.iter().all(|v| *v > 0.0);
        assert!(positive.is_feasible(&[1.0, 0.5]));
        assert!(!positive.is_feasible(&[1.0, -0.5]));
        assert!(Unconstrained.is_feasible(&[f64::MAX]));
    }

    #[test]
    fn memory_logger_drains() {
        let logger = MemoryLogger::new();
        logger.log_message("first");
        logger.log_message("second");
        assert!(logger.contains("sec"));
        assert_eq!(logger.drain(), vec!["first", "second"]);
        assert!(logger.messages().is_empty());
    }
}
