use crate::core::{Assignment, Factor, FactorResult, State, VariableId};

/// A unit degree factor equal to 1 at one state of a variable and 0 elsewhere
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFactor<S: State> {
    variable: VariableId,
    state: S,
}

impl<S: State> IndicatorFactor<S> {
    #[inline]
    pub fn new(variable: VariableId, state: S) -> Self {
        IndicatorFactor { variable, state }
    }
}

impl<S: State> Factor for IndicatorFactor<S> {
    type State = S;

    #[inline(always)]
    fn evaluate(&self, assignment: &Assignment<'_, S>) -> FactorResult<f64> {
        if *assignment.value(self.variable)? == self.state {
            Ok(1f64)
        } else {
            Ok(0f64)
        }
    }
}
