use super::error::{SwarmError, SwarmResult};
use serde::{Deserialize, Serialize};

/// Recovery policy applied after every move
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Resample uniformly inside the bounds until the position is usable
    #[default]
    Random,
    /// Revert and bounce the last displacement off the violated bound
    Reflecting,
    /// Revert and drop the displacement along the violated dimensions
    Absorbing,
    /// Deactivate the agent and leave it where it is
    Invisible,
}

impl BoundaryMode {
    pub fn code(self) -> u8 {
        match self {
            BoundaryMode::Random => 1,
            BoundaryMode::Reflecting => 2,
            BoundaryMode::Absorbing => 3,
            BoundaryMode::Invisible => 4,
        }
    }
}

impl TryFrom<u8> for BoundaryMode {
    type Error = SwarmError;

    fn try_from(code: u8) -> SwarmResult<Self> {
        match code {
            1 => Ok(BoundaryMode::Random),
            2 => Ok(BoundaryMode::Reflecting),
            3 => Ok(BoundaryMode::Absorbing),
            4 => Ok(BoundaryMode::Invisible),
            other => Err(SwarmError::config(format!(
                "unknown boundary mode {} (expected 1-4)",
                other
            ))),
        }
    }
}

/// Algorithm parameters for the chicken swarm
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Total population. `None` means the sum of the role counts.
    pub agent_count: Option<usize>,
    pub rooster_count: usize,
    /// Total hens, mother hens included
    pub hen_count: usize,
    pub mother_hen_count: usize,
    pub chick_count: usize,
    /// Rebuild the hierarchy every `regroup_interval` iterations
    pub regroup_interval: u64,
    pub boundary: BoundaryMode,
    /// Cap on rejection sampling in random placement and recovery
    pub max_resample_attempts: usize,
    /// Full sweeps over an all-inactive population before the run is stalled
    pub max_idle_sweeps: usize,
    pub seed: Option<u64>,
    /// Detailed per-step reports through the logger
    pub verbose: bool,
}

impl SwarmConfig {
    pub fn new(
        rooster_count: usize,
        hen_count: usize,
        mother_hen_count: usize,
        chick_count: usize,
        regroup_interval: u64,
        boundary: BoundaryMode,
    ) -> Self {
        SwarmConfig {
            agent_count: None,
            rooster_count,
            hen_count,
            mother_hen_count,
            chick_count,
            regroup_interval,
            boundary,
            max_resample_attempts: 10_000,
            max_idle_sweeps: 3,
            seed: None,
            verbose: false,
        }
    }

    pub fn with_agent_count(mut self, agent_count: usize) -> Self {
        self.agent_count = Some(agent_count);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json(json: &str) -> SwarmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SwarmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub(crate) fn population_size(&self) -> usize {
        self.agent_count
            .unwrap_or(self.rooster_count + self.hen_count + self.chick_count)
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self::new(3, 12, 8, 15, 150, BoundaryMode::Random)
    }
}

/// The problem being optimized: search box, targets and stopping criteria
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProblemConfig {
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    /// Per-output weights applied to the distance from target
    #[serde(default)]
    pub weights: Vec<f64>,
    pub output_size: usize,
    pub targets: Vec<f64>,
    pub tolerance: f64,
    pub max_iterations: u64,
}

impl ProblemConfig {
    pub fn new(
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        targets: Vec<f64>,
        tolerance: f64,
        max_iterations: u64,
    ) -> Self {
        let output_size = targets.len();
        ProblemConfig {
            lower_bounds,
            upper_bounds,
            weights: vec![1.0; output_size],
            output_size,
            targets,
            tolerance,
            max_iterations,
        }
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn dimension(&self) -> usize {
        self.lower_bounds.len()
    }

    /// Checks that bounds, targets and weights agree on their dimensions.
    /// Empty weights are filled with ones.
    pub fn validate(&mut self) -> SwarmResult<()> {
        if self.lower_bounds.is_empty() {
            return Err(SwarmError::InvalidBounds(
                "bounds must have at least one dimension".to_string(),
            ));
        }
        if self.lower_bounds.len() != self.upper_bounds.len() {
            return Err(SwarmError::InvalidBounds(format!(
                "lower bounds have {} dimensions, upper bounds have {}",
                self.lower_bounds.len(),
                self.upper_bounds.len()
            )));
        }
        for (i, (lo, hi)) in self.lower_bounds.iter().zip(&self.upper_bounds).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(SwarmError::InvalidBounds(format!(
                    "dimension {}: [{}, {}] is not a finite interval",
                    i, lo, hi
                )));
            }
        }
        if self.output_size == 0 {
            return Err(SwarmError::config("output size must be at least 1"));
        }
        if self.targets.len() != self.output_size {
            return Err(SwarmError::DimensionMismatch {
                expected: self.output_size,
                found: self.targets.len(),
            });
        }
        if self.weights.is_empty() {
            self.weights = vec![1.0; self.output_size];
        }
        if self.weights.len() != self.output_size {
            return Err(SwarmError::DimensionMismatch {
                expected: self.output_size,
                found: self.weights.len(),
            });
        }
        Ok(())
    }
}
