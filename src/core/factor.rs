use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::variable::{State, VariableId};

// ------------------------------------------------------------------------------------------

/// Errors that a potential function could report
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FactorError {
    /// An assignment does not contain a variable the factor depends on
    #[error("Assignment does not contain variable {0}")]
    MissingVariable(VariableId),

    /// An assignment contains a state that is not a part of the variable's domain
    #[error("State {state} is not in the domain of variable {variable}")]
    UnknownState {
        /// The variable the state was assigned to
        variable: VariableId,

        /// Debug representation of the state
        state: String,
    },

    /// Any other failure of a user defined potential
    #[error("{0}")]
    Custom(String),
}

/// Potential function result type
pub type FactorResult<T> = Result<T, FactorError>;

// ------------------------------------------------------------------------------------------

/// ID (index) of a factor in a factor graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactorId(pub usize);

impl Display for FactorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

// ------------------------------------------------------------------------------------------

/// A full assignment of states to the variables adjacent to a factor
///
/// # Notes
///
/// Entries follow the order in which adjacent variables were passed
/// to the builder, so a factor may read them either by ID or by position
#[derive(Debug, Clone)]
pub struct Assignment<'a, S: State> {
    entries: Vec<(VariableId, &'a S)>,
}

impl<'a, S: State> Assignment<'a, S> {
    /// Creates an assignment from `(variable, state)` pairs
    #[inline]
    pub fn new(entries: Vec<(VariableId, &'a S)>) -> Self {
        Assignment { entries }
    }

    /// Returns a state assigned to a variable or fails if the variable is absent
    #[inline]
    pub fn value(&self, variable: VariableId) -> FactorResult<&'a S> {
        self.get(variable)
            .ok_or(FactorError::MissingVariable(variable))
    }

    /// Returns a state assigned to a variable if any
    #[inline]
    pub fn get(&self, variable: VariableId) -> Option<&'a S> {
        self.entries
            .iter()
            .find(|(v, _)| *v == variable)
            .map(|(_, s)| *s)
    }

    /// Returns a state by its position in a factor's scope
    #[inline]
    pub fn at(&self, position: usize) -> Option<&'a S> {
        self.entries.get(position).map(|(_, s)| *s)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &'a S)> + '_ {
        self.entries.iter().copied()
    }
}

// ------------------------------------------------------------------------------------------

/// A potential function over a joint assignment of adjacent variables
///
/// # Notes
///
/// The engine calls `evaluate` only with complete assignments over the
/// factor's neighbors. A returned weight must be finite and non-negative,
/// otherwise message passing stops with an error
pub trait Factor: Debug + Send + Sync {
    /// Type of variable states
    type State: State;

    /// Evaluates the unnormalized potential of an assignment
    ///
    /// # Arguments
    ///
    /// * `assignment` - States of all variables adjacent to the factor
    fn evaluate(&self, assignment: &Assignment<'_, Self::State>) -> FactorResult<f64>;
}
