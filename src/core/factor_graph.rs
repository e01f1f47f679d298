use std::{collections::BTreeMap, fmt::Display};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{
    factor::{FactorError, FactorId},
    factor_node::FactorNode,
    message::{Message, MessageError},
    variable::{State, Variable, VariableId},
    variable_node::VariableNode,
};

// ------------------------------------------------------------------------------------------

/// Errors that could appear in factor graph's methods
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum FGError {
    /// Inference was requested before messages were initialized
    #[error("Messages are not initialized, call initialize_messages first")]
    Uninitialized,

    /// A potential function failed
    #[error("Factor {factor} failed: {source}")]
    Factor {
        /// Name of the failed factor
        factor: String,

        /// Reported failure
        #[source]
        source: FactorError,
    },

    /// A potential function returned a negative or non-finite weight
    #[error("Factor {factor} returned an invalid weight {weight}")]
    InvalidPotential {
        /// Name of the factor
        factor: String,

        /// The returned weight
        weight: f64,
    },

    /// The product of incoming messages of a variable has zero total weight
    #[error("Belief of variable {variable} has zero total weight")]
    DegenerateBelief {
        /// Name of the variable
        variable: String,
    },

    /// Message weights of a variable overflowed, which happens on graphs with
    /// cycles when variable to factor messages are not normalized
    #[error("Messages of variable {variable} overflowed, consider normalize_outgoing")]
    Overflow {
        /// Name of the variable
        variable: String,
    },

    /// Message algebra error
    #[error(transparent)]
    Message(#[from] MessageError),

    /// Index of a variable is out of range
    #[error("Index of a variable {1} is out of range of [0..{0}] variables")]
    OutOfRangeVariable(usize, usize),

    /// Index of a factor is out of range
    #[error("Index of a factor {1} is out of range of [0..{0}] factors")]
    OutOfRangeFactor(usize, usize),

    /// Hyper-parameters of message passing are invalid
    #[error("Invalid message passing configuration: {0}")]
    InvalidConfig(String),
}

/// Factor graph's methods result type
pub type FGResult<T> = Result<T, FGError>;

// ------------------------------------------------------------------------------------------

/// Stage of inference a factor graph is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InferenceState {
    /// Edge messages have not been seeded yet
    Uninitialized,

    /// Edge messages are seeded, no sweep has been run since
    Initialized,

    /// The last run stopped because the drift fell below the threshold
    Converged,

    /// The last run stopped because the sweep budget was exhausted
    Exhausted,
}

/// Reason message passing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The drift of a sweep fell below the threshold
    Converged,

    /// The sweep budget ran out before the drift fell below the threshold
    Exhausted,
}

/// A diagnostic event emitted after each sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    /// Index of the sweep, starts from 0
    pub sweep: usize,

    /// Total L1 drift of all edge messages during the sweep
    pub error: f64,
}

/// Information returned after message passing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BPInfo {
    /// Whether the process converged or ran out of sweeps
    pub status: Termination,

    /// Number of completed sweeps
    pub sweeps: usize,

    /// Drift of the last sweep, `None` if no sweep has been run
    pub last_error: Option<f64>,

    /// Drift of every sweep
    pub error_dynamics: Vec<f64>,
}

impl BPInfo {
    #[inline]
    pub fn converged(&self) -> bool {
        self.status == Termination::Converged
    }
}

impl Display for BPInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self.status {
            Termination::Converged => "converged",
            Termination::Exhausted => "has not converged",
        };
        match self.last_error {
            Some(error) => write!(
                f,
                "Message passing {} after {} sweeps, last sweep drift: {}",
                status, self.sweeps, error,
            ),
            None => write!(f, "Message passing {} after {} sweeps", status, self.sweeps),
        }
    }
}

// ------------------------------------------------------------------------------------------

/// An edge between a variable and a factor holding messages in both directions
#[derive(Debug, Clone)]
pub(crate) struct Edge<S: State> {
    pub(crate) variable: VariableId,
    pub(crate) factor: FactorId,
    pub(crate) v_2_f: Message<S>,
    pub(crate) f_2_v: Message<S>,
}

impl<S: State> Edge<S> {
    #[inline]
    pub(crate) fn new(variable: VariableId, factor: FactorId) -> Self {
        Edge {
            variable,
            factor,
            v_2_f: Message::new(),
            f_2_v: Message::new(),
        }
    }
}

/// A bipartite factor graph
///
/// The topology is fixed by [`crate::core::FactorGraphBuilder`], only
/// edge messages change during inference
#[derive(Debug)]
pub struct FactorGraph<S: State> {
    pub(crate) variables: Vec<VariableNode<S>>,
    pub(crate) factors: Vec<FactorNode<S>>,
    pub(crate) edges: Vec<Edge<S>>,
    pub(crate) state: InferenceState,
}

impl<S: State> FactorGraph<S> {
    #[inline]
    pub fn state(&self) -> InferenceState {
        self.state
    }

    #[inline]
    pub fn variables_number(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn factors_number(&self) -> usize {
        self.factors.len()
    }

    #[inline]
    pub fn variable(&self, id: VariableId) -> Option<&Variable<S>> {
        self.variables.get(id.0).map(|node| &node.variable)
    }

    /// Iterates over variables in order they were added
    #[inline]
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable<S>)> + '_ {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, node)| (VariableId(i), &node.variable))
    }

    /// Finds a variable by its name
    #[inline]
    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|node| node.variable.name == name)
            .map(VariableId)
    }

    #[inline]
    pub fn factor_name(&self, id: FactorId) -> Option<&str> {
        self.factors.get(id.0).map(|node| node.name.as_str())
    }

    /// Returns adjacent variables of a factor in order they were passed to the builder
    #[inline]
    pub fn factor_scope(&self, id: FactorId) -> Option<&[VariableId]> {
        self.factors.get(id.0).map(|node| node.scope.as_slice())
    }

    /// Iterates over all edges as `(variable, factor)` pairs
    #[inline]
    pub fn edges(&self) -> impl Iterator<Item = (VariableId, FactorId)> + '_ {
        self.edges.iter().map(|edge| (edge.variable, edge.factor))
    }

    /// Returns degree (number of adjoint factors) of each variable
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::FactorGraphBuilder;
    /// use ndarray::{array, ArrayD};
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    /// let y = fgb.add_variable("y", [0u8, 1]).unwrap();
    /// let table: ArrayD<f64> = array![[1., 2.], [3., 4.]].into_dyn();
    /// fgb.add_table_factor("f", &[x, y], table).unwrap();
    /// let fg = fgb.build();
    /// assert_eq!(fg.variable_degrees(), vec![1, 1]);
    /// assert_eq!(fg.factor_degrees(), vec![2]);
    /// ```
    #[inline]
    pub fn variable_degrees(&self) -> Vec<usize> {
        self.variables.iter().map(|x| x.degree()).collect()
    }

    /// Returns degree (number of adjoint variables) of each factor
    /// in order they were added to a factor graph
    #[inline]
    pub fn factor_degrees(&self) -> Vec<usize> {
        self.factors.iter().map(|x| x.degree()).collect()
    }

    /// Returns `(v_2_f, f_2_v)` messages of the edge between a variable and a factor
    pub fn edge_messages(
        &self,
        variable: VariableId,
        factor: FactorId,
    ) -> Option<(&Message<S>, &Message<S>)> {
        let node = self.variables.get(variable.0)?;
        node.edges
            .iter()
            .map(|e| &self.edges[*e])
            .find(|edge| edge.factor == factor)
            .map(|edge| (&edge.v_2_f, &edge.f_2_v))
    }

    /// Computes beliefs (unnormalized products of incoming factor messages) for all variables
    ///
    /// # Notes
    ///
    /// A variable without adjoint factors gets the uniform message `1 / n`
    /// over its domain of size `n`
    pub fn calc_belief(&self) -> FGResult<BTreeMap<VariableId, Message<S>>> {
        self.ensure_initialized()?;
        Ok(self
            .variables
            .iter()
            .enumerate()
            .map(|(i, node)| (VariableId(i), node.belief(&self.edges)))
            .collect())
    }

    /// Computes the belief of a single variable
    pub fn belief(&self, variable: VariableId) -> FGResult<Message<S>> {
        self.ensure_initialized()?;
        let node = self
            .variables
            .get(variable.0)
            .ok_or(FGError::OutOfRangeVariable(self.variables.len(), variable.0))?;
        Ok(node.belief(&self.edges))
    }

    /// Computes normalized marginals for all variables as dense vectors
    /// ordered as the variables' domains
    pub fn marginals(&self) -> FGResult<Vec<Array1<f64>>> {
        self.ensure_initialized()?;
        self.variables
            .iter()
            .map(|node| -> FGResult<Array1<f64>> {
                let belief = node
                    .belief(&self.edges)
                    .normalized()
                    .map_err(|error| node.attribute_error(error))?;
                Ok(belief.to_dense(&node.variable.domain))
            })
            .collect()
    }

    #[inline]
    pub(crate) fn ensure_initialized(&self) -> FGResult<()> {
        if self.state == InferenceState::Uninitialized {
            Err(FGError::Uninitialized)
        } else {
            Ok(())
        }
    }
}
