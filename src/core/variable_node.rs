use log::trace;

use crate::core::{
    factor_graph::{Edge, FGError, FGResult},
    message::{Message, MessageError},
    variable::{State, Variable},
};

#[derive(Debug, Clone)]
pub(crate) struct VariableNode<S: State> {
    pub(crate) variable: Variable<S>,
    pub(crate) edges: Vec<usize>,
}

impl<S: State> VariableNode<S> {
    #[inline(always)]
    pub(super) fn new_disconnected(variable: Variable<S>) -> Self {
        VariableNode {
            variable,
            edges: Vec::new(),
        }
    }

    #[inline(always)]
    pub(super) fn degree(&self) -> usize {
        self.edges.len()
    }

    /// Seed of every incident message, `(1/n)^(1/d)` at each state,
    /// so that the product of `d` seeds is uniform with mass `1/n` per state
    pub(super) fn seed(&self) -> Option<Message<S>> {
        let degree = self.degree();
        if degree == 0 {
            return None;
        }
        let n = self.variable.domain_size() as f64;
        let weight = (1f64 / n).powf(1f64 / degree as f64);
        Some(Message::uniform(self.variable.domain.iter().cloned(), weight))
    }

    #[inline]
    fn incoming_product(&self, edges: &[Edge<S>]) -> Option<Message<S>> {
        Message::product(self.edges.iter().map(|e| &edges[*e].f_2_v))
    }

    pub(super) fn belief(&self, edges: &[Edge<S>]) -> Message<S> {
        self.incoming_product(edges).unwrap_or_else(|| {
            let n = self.variable.domain_size() as f64;
            Message::uniform(self.variable.domain.iter().cloned(), 1f64 / n)
        })
    }

    /// Evaluates messages to adjoint factors. The i-th message is the product
    /// of all incoming factor messages divided by the one received over the i-th edge
    pub(super) fn eval_messages(&self, edges: &[Edge<S>]) -> FGResult<Vec<Message<S>>> {
        let combined = match self.incoming_product(edges) {
            Some(combined) => combined,
            None => return Ok(Vec::new()),
        };
        self.edges
            .iter()
            .map(|e| {
                combined
                    .divide(&edges[*e].f_2_v)
                    .map_err(|error| self.attribute_error(error))
            })
            .collect()
    }

    /// Attributes a failure of message algebra to this variable
    pub(super) fn attribute_error(&self, error: MessageError) -> FGError {
        let variable = self.variable.name.clone();
        match error {
            MessageError::ZeroTotalWeight => FGError::DegenerateBelief { variable },
            MessageError::NonFiniteTotal { .. } | MessageError::NonFiniteWeight { .. } => {
                FGError::Overflow { variable }
            }
            other => FGError::Message(other),
        }
    }

    /// Evaluates the coefficient `(1/Z)^(1/d)` that makes the product of
    /// incoming factor messages normalized, `None` for an isolated variable
    pub(super) fn eval_normalization(&self, edges: &[Edge<S>]) -> FGResult<Option<f64>> {
        let mut combined = match self.incoming_product(edges) {
            Some(combined) => combined,
            None => return Ok(None),
        };
        let z = combined
            .normalize()
            .map_err(|error| self.attribute_error(error))?;
        trace!("variable {}: normalization constant {:e}", self.variable.name, z);
        Ok(Some((1f64 / z).powf(1f64 / self.degree() as f64)))
    }
}
