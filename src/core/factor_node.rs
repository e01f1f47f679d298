use crate::core::{
    factor::{Assignment, Factor},
    factor_graph::{Edge, FGError, FGResult},
    message::Message,
    variable::{State, VariableId},
    variable_node::VariableNode,
};

#[derive(Debug)]
pub(crate) struct FactorNode<S: State> {
    pub(crate) name: String,
    factor: Box<dyn Factor<State = S>>,
    pub(crate) scope: Vec<VariableId>,
    pub(crate) edges: Vec<usize>,
}

impl<S: State> FactorNode<S> {
    #[inline(always)]
    pub(super) fn new_disconnected(name: String, factor: Box<dyn Factor<State = S>>) -> Self {
        FactorNode {
            name,
            factor,
            scope: Vec::new(),
            edges: Vec::new(),
        }
    }

    #[inline(always)]
    pub(super) fn degree(&self) -> usize {
        self.scope.len()
    }

    /// Evaluates the potential and checks that the weight is a valid one
    fn evaluate(&self, assignment: &Assignment<'_, S>) -> FGResult<f64> {
        let weight = self
            .factor
            .evaluate(assignment)
            .map_err(|source| FGError::Factor {
                factor: self.name.clone(),
                source,
            })?;
        if !weight.is_finite() || weight < 0f64 {
            return Err(FGError::InvalidPotential {
                factor: self.name.clone(),
                weight,
            });
        }
        Ok(weight)
    }

    /// Evaluates messages to adjoint variables. For the variable at `position`
    /// and each state `x` of its domain the message weight is
    /// the sum over supports of the other variables' messages of
    /// `factor(x, a) * prod_u v_2_f[u](a[u])`
    pub(super) fn eval_messages(
        &self,
        edges: &[Edge<S>],
        variables: &[VariableNode<S>],
    ) -> FGResult<Vec<Message<S>>> {
        (0..self.degree())
            .map(|position| self.eval_message(position, edges, variables))
            .collect()
    }

    fn eval_message(
        &self,
        position: usize,
        edges: &[Edge<S>],
        variables: &[VariableNode<S>],
    ) -> FGResult<Message<S>> {
        let target = self.scope[position];
        let others: Vec<usize> = (0..self.degree()).filter(|p| *p != position).collect();
        let supports: Vec<Vec<(&S, f64)>> = others
            .iter()
            .map(|p| edges[self.edges[*p]].v_2_f.iter().collect())
            .collect();
        if supports.iter().any(|support| support.is_empty()) {
            return Ok(Message::new());
        }
        let sizes: Vec<usize> = supports.iter().map(|support| support.len()).collect();
        let domain = &variables[target.0].variable.domain;
        let mut weights = Vec::with_capacity(domain.len());
        for x in domain {
            let mut sum = 0f64;
            let mut indices = vec![0usize; supports.len()];
            loop {
                let mut entries = Vec::with_capacity(self.degree());
                let mut coefficient = 1f64;
                let mut other = 0;
                for (p, var) in self.scope.iter().enumerate() {
                    if p == position {
                        entries.push((*var, x));
                    } else {
                        let (state, weight) = supports[other][indices[other]];
                        entries.push((*var, state));
                        coefficient *= weight;
                        other += 1;
                    }
                }
                sum += self.evaluate(&Assignment::new(entries))? * coefficient;
                if !next_index(&mut indices, &sizes) {
                    break;
                }
            }
            if !sum.is_finite() {
                return Err(FGError::Overflow {
                    variable: variables[target.0].variable.name.clone(),
                });
            }
            weights.push((x.clone(), sum));
        }
        Ok(Message::from_weights(weights)?)
    }
}

/// Advances a mixed radix counter, returns `false` once it wraps around
#[inline]
fn next_index(indices: &mut [usize], sizes: &[usize]) -> bool {
    for (index, size) in indices.iter_mut().zip(sizes) {
        *index += 1;
        if *index < *size {
            return true;
        }
        *index = 0;
    }
    false
}
