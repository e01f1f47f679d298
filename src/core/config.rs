use serde::{Deserialize, Serialize};

use crate::core::factor_graph::{FGError, FGResult};

/// Hyper-parameters of belief propagation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BPConfig {
    /// A maximal number of sweeps, reaching it is a normal termination
    pub max_iter: usize,

    /// A minimal number of sweeps performed disregarding the convergence criterion
    pub min_iter: usize,

    /// Message passing stops once the total L1 drift of messages is not
    /// greater than this threshold
    pub max_error: f64,

    /// Exponential moving average coefficient applied to factor to variable
    /// messages, 0 disables damping
    pub damping: f64,

    /// Normalizes every variable to factor message after the variable phase.
    /// Keeps message scales bounded on graphs with cycles
    pub normalize_outgoing: bool,
}

impl Default for BPConfig {
    fn default() -> Self {
        BPConfig {
            max_iter: 100,
            min_iter: 0,
            max_error: 1e-9,
            damping: 0f64,
            normalize_outgoing: false,
        }
    }
}

impl BPConfig {
    /// Creates a configuration with the given budgets and default other parameters
    #[inline]
    pub fn new(max_iter: usize, max_error: f64) -> Self {
        BPConfig {
            max_iter,
            max_error,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FGResult<()> {
        if !self.max_error.is_finite() || self.max_error < 0f64 {
            return Err(FGError::InvalidConfig(format!(
                "max_error must be finite and non-negative, got {}",
                self.max_error
            )));
        }
        if !(0f64..1f64).contains(&self.damping) {
            return Err(FGError::InvalidConfig(format!(
                "damping must lie in [0, 1), got {}",
                self.damping
            )));
        }
        Ok(())
    }
}
