use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn};

use crate::core::{
    Assignment, FGBuilderError, FGBuilderResult, Factor, FactorError, FactorResult, State,
    VariableId,
};

/// A factor defined by a dense table of weights
///
/// The i-th axis of a table runs over the domain of the i-th variable of a scope
#[derive(Debug, Clone)]
pub struct TableFactor<S: State> {
    scope: Vec<VariableId>,
    indices: Vec<BTreeMap<S, usize>>,
    table: ArrayD<f64>,
}

impl<S: State> TableFactor<S> {
    /// Creates a new table factor
    ///
    /// # Arguments
    ///
    /// * `scope` - Adjoint variables together with their domains
    /// * `table` - Weights, must be finite and non-negative
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::{Assignment, Factor, VariableId};
    /// use sumprod::factors::TableFactor;
    /// use ndarray::array;
    ///
    /// let (a, b) = (VariableId(0), VariableId(1));
    /// let factor = TableFactor::new(
    ///     vec![(a, vec!["lo", "hi"]), (b, vec!["lo", "hi"])],
    ///     array![[4., 1.], [1., 4.]].into_dyn(),
    /// )
    /// .unwrap();
    /// let assignment = Assignment::new(vec![(b, &"hi"), (a, &"lo")]);
    /// assert_eq!(factor.evaluate(&assignment).unwrap(), 1.);
    /// ```
    pub fn new(scope: Vec<(VariableId, Vec<S>)>, table: ArrayD<f64>) -> FGBuilderResult<Self> {
        let expected: Vec<usize> = scope.iter().map(|(_, domain)| domain.len()).collect();
        if table.shape() != expected.as_slice() {
            return Err(FGBuilderError::TableShape {
                expected,
                found: table.shape().to_vec(),
            });
        }
        if table.iter().any(|w| !w.is_finite() || *w < 0f64) {
            return Err(FGBuilderError::InvalidTableWeight);
        }
        let (scope, indices): (Vec<VariableId>, Vec<BTreeMap<S, usize>>) = scope
            .into_iter()
            .map(|(variable, domain)| {
                let index = domain
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| (s, i))
                    .collect::<BTreeMap<_, _>>();
                (variable, index)
            })
            .unzip();
        Ok(TableFactor {
            scope,
            indices,
            table,
        })
    }

    #[inline]
    pub fn scope(&self) -> &[VariableId] {
        &self.scope
    }

    #[inline]
    pub fn table(&self) -> &ArrayD<f64> {
        &self.table
    }
}

impl<S: State> Factor for TableFactor<S> {
    type State = S;

    fn evaluate(&self, assignment: &Assignment<'_, S>) -> FactorResult<f64> {
        let mut position = Vec::with_capacity(self.scope.len());
        for (variable, index) in self.scope.iter().zip(&self.indices) {
            let state = assignment.value(*variable)?;
            let i = index.get(state).ok_or_else(|| FactorError::UnknownState {
                variable: *variable,
                state: format!("{:?}", state),
            })?;
            position.push(*i);
        }
        self.table
            .get(IxDyn(&position))
            .copied()
            .ok_or_else(|| FactorError::Custom(format!("table index {:?} out of bounds", position)))
    }
}
