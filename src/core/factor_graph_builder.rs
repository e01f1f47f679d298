use std::collections::BTreeSet;

use ndarray::ArrayD;
use thiserror::Error;

use crate::{
    core::{
        factor::{Factor, FactorId},
        factor_graph::{Edge, FactorGraph, InferenceState},
        factor_node::FactorNode,
        variable::{State, Variable, VariableId},
        variable_node::VariableNode,
    },
    factors::{IndicatorFactor, TableFactor},
};

// ------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors that could appear in factor graph builder's methods
pub enum FGBuilderError {
    /// Index of a variable is out of range
    #[error("ID (index) of a variable {1} is out of range of [0..{0}] variables")]
    OutOfRangeVariable(usize, usize),

    /// A variable was registered with an empty domain
    #[error("Domain of variable {0} is empty")]
    EmptyDomain(String),

    /// A variable's domain lists the same state twice
    #[error("State {state} appears twice in the domain of variable {variable}")]
    DuplicateState { variable: String, state: String },

    /// A state is not a part of a variable's domain
    #[error("State {state} is not in the domain of variable {variable}")]
    UnknownState { variable: String, state: String },

    /// Two variables share a name
    #[error("Variable {0} is already registered")]
    DuplicateVariable(String),

    /// A factor lists the same variable twice
    #[error("Factor {factor} lists variable {variable} more than once")]
    DuplicateNeighbor { factor: String, variable: VariableId },

    /// A factor has no adjacent variables
    #[error("Factor {0} has no adjacent variables")]
    EmptyScope(String),

    /// Shape of a potential table does not match domains of the adjacent variables
    #[error("Table shape {found:?} does not match domain sizes {expected:?}")]
    TableShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A potential table contains a negative or non-finite entry
    #[error("Table contains an invalid weight, weights must be finite and non-negative")]
    InvalidTableWeight,
}

/// Factor graph builder's methods result type
pub type FGBuilderResult<T> = Result<T, FGBuilderError>;

// public methods ---------------------------------------------------------------------------

#[derive(Debug)]
/// A factor graph builder
pub struct FactorGraphBuilder<S: State> {
    variables: Vec<VariableNode<S>>,
    factors: Vec<FactorNode<S>>,
    edges: Vec<Edge<S>>,
}

impl<S: State> Default for FactorGraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> FactorGraphBuilder<S> {
    /// Creates an empty factor graph
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::FactorGraphBuilder;
    ///
    /// let fgb = FactorGraphBuilder::<bool>::new();
    /// ```
    #[inline]
    pub fn new() -> Self {
        FactorGraphBuilder {
            variables: Vec::new(),
            factors: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a variable to a factor graph
    ///
    /// # Arguments
    ///
    /// * `name` - A unique name of a variable
    /// * `domain` - States a variable could take
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::{FactorGraphBuilder, VariableId};
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// let rain = fgb.add_variable("rain", [false, true]).unwrap();
    /// assert_eq!(rain, VariableId(0));
    /// assert!(fgb.add_variable("rain", [false, true]).is_err());
    /// assert!(fgb.add_variable("sprinkler", []).is_err());
    /// ```
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        domain: impl IntoIterator<Item = S>,
    ) -> FGBuilderResult<VariableId> {
        let name = name.into();
        if self.variable_id(&name).is_some() {
            return Err(FGBuilderError::DuplicateVariable(name));
        }
        let domain: Vec<S> = domain.into_iter().collect();
        if domain.is_empty() {
            return Err(FGBuilderError::EmptyDomain(name));
        }
        let mut seen = BTreeSet::new();
        for state in &domain {
            if !seen.insert(state) {
                return Err(FGBuilderError::DuplicateState {
                    variable: name,
                    state: format!("{:?}", state),
                });
            }
        }
        self.variables
            .push(VariableNode::new_disconnected(Variable { name, domain }));
        Ok(VariableId(self.variables.len() - 1))
    }

    /// Finds a registered variable by its name
    #[inline]
    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|node| node.variable.name == name)
            .map(VariableId)
    }

    /// Returns a registered variable
    #[inline]
    pub fn variable(&self, id: VariableId) -> Option<&Variable<S>> {
        self.variables.get(id.0).map(|node| &node.variable)
    }

    /// Adds a factor to a factor graph
    ///
    /// # Arguments
    ///
    /// * `name` - A name of a factor used in error reports
    /// * `factor` - A potential function
    /// * `scope` - IDs of adjoint variables, a factor receives assignments
    ///     listing them in this order
    ///
    /// # Notes
    ///
    /// If an ID from `scope` is out of range of the variables list or
    /// repeats, the method returns an error and the builder stays unchanged
    pub fn add_factor<F>(
        &mut self,
        name: impl Into<String>,
        factor: F,
        scope: &[VariableId],
    ) -> FGBuilderResult<FactorId>
    where
        F: Factor<State = S> + 'static,
    {
        let name = name.into();
        self.check_scope(&name, scope)?;
        let factor_id = FactorId(self.factors.len());
        let mut factor_node = FactorNode::new_disconnected(name, Box::new(factor));
        for variable in scope {
            let edge_index = self.edges.len();
            self.edges.push(Edge::new(*variable, factor_id));
            self.variables[variable.0].edges.push(edge_index);
            factor_node.scope.push(*variable);
            factor_node.edges.push(edge_index);
        }
        self.factors.push(factor_node);
        Ok(factor_id)
    }

    /// Adds a factor defined by a table of weights
    ///
    /// # Arguments
    ///
    /// * `name` - A name of a factor
    /// * `scope` - IDs of adjoint variables
    /// * `table` - Weights, the i-th axis runs over the domain of the i-th
    ///     variable in order the domain was registered
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::FactorGraphBuilder;
    /// use ndarray::array;
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// let a = fgb.add_variable("a", ['x', 'y', 'z']).unwrap();
    /// let b = fgb.add_variable("b", ['x', 'y']).unwrap();
    /// let table = array![[1., 0.], [0., 1.], [0.5, 0.5]].into_dyn();
    /// fgb.add_table_factor("ab", &[a, b], table.clone()).unwrap();
    /// assert!(fgb.add_table_factor("ba", &[b, a], table).is_err());
    /// ```
    pub fn add_table_factor(
        &mut self,
        name: impl Into<String>,
        scope: &[VariableId],
        table: ArrayD<f64>,
    ) -> FGBuilderResult<FactorId> {
        let name = name.into();
        self.check_scope(&name, scope)?;
        let scope_domains = scope
            .iter()
            .map(|v| (*v, self.variables[v.0].variable.domain.clone()))
            .collect();
        let factor = TableFactor::new(scope_domains, table)?;
        self.add_factor(name, factor, scope)
    }

    /// Clamps a variable to a state by attaching a unit degree indicator factor
    ///
    /// # Notes
    ///
    /// One should not clamp a variable to two different states, this
    /// makes its belief identically zero
    pub fn add_evidence(&mut self, variable: VariableId, state: S) -> FGBuilderResult<FactorId> {
        let node = self
            .variables
            .get(variable.0)
            .ok_or(FGBuilderError::OutOfRangeVariable(self.variables.len(), variable.0))?;
        if !node.variable.domain.contains(&state) {
            return Err(FGBuilderError::UnknownState {
                variable: node.variable.name.clone(),
                state: format!("{:?}", state),
            });
        }
        let name = format!("evidence({})", node.variable.name);
        self.add_factor(name, IndicatorFactor::new(variable, state), &[variable])
    }

    /// Returns a factor graph with uninitialized messages
    #[inline]
    pub fn build(self) -> FactorGraph<S> {
        FactorGraph {
            variables: self.variables,
            factors: self.factors,
            edges: self.edges,
            state: InferenceState::Uninitialized,
        }
    }
}

// private methods --------------------------------------------------------------------------

impl<S: State> FactorGraphBuilder<S> {
    fn check_scope(&self, name: &str, scope: &[VariableId]) -> FGBuilderResult<()> {
        if scope.is_empty() {
            return Err(FGBuilderError::EmptyScope(name.to_string()));
        }
        let mut seen = BTreeSet::new();
        for variable in scope {
            if variable.0 >= self.variables.len() {
                return Err(FGBuilderError::OutOfRangeVariable(
                    self.variables.len(),
                    variable.0,
                ));
            }
            if !seen.insert(*variable) {
                return Err(FGBuilderError::DuplicateNeighbor {
                    factor: name.to_string(),
                    variable: *variable,
                });
            }
        }
        Ok(())
    }
}
