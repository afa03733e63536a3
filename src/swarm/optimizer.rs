/// Step-driven interface shared by population optimizers.
///
/// A driver alternates `step` (advance one agent) and `call_objective`
/// (evaluate the agent the optimizer is now pointing at) until `complete`.
pub trait Optimizer {
    fn step(&mut self, suppress_output: bool);

    /// Evaluates the current agent. Returns false when the evaluation failed
    /// or the agent is inactive.
    fn call_objective(&mut self, allow_update: bool) -> bool;

    fn converged(&self) -> bool;

    fn maxed(&self) -> bool;

    fn complete(&self) -> bool {
        self.converged() || self.maxed()
    }

    /// `(iteration, norm of the best fitness)`
    fn get_convergence_data(&self) -> (u64, f64);

    fn get_optimized_soln(&self) -> Vec<f64>;

    fn get_optimized_outs(&self) -> Vec<f64>;

    /// Position the next `call_objective` will evaluate
    fn get_obj_inputs(&self) -> Vec<f64>;
}
