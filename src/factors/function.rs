use std::{fmt::Debug, marker::PhantomData};

use crate::core::{Assignment, Factor, FactorResult, State};

/// A factor backed by a closure
///
/// # Example
///
/// ```
/// use sumprod::core::{Assignment, Factor, FactorResult, VariableId};
/// use sumprod::factors::FnFactor;
///
/// let (a, b) = (VariableId(0), VariableId(1));
/// let equal = FnFactor::new(move |x: &Assignment<'_, u8>| -> FactorResult<f64> {
///     Ok(if x.value(a)? == x.value(b)? { 2. } else { 1. })
/// });
/// assert_eq!(equal.evaluate(&Assignment::new(vec![(a, &1), (b, &1)])).unwrap(), 2.);
/// assert!(equal.evaluate(&Assignment::new(vec![(a, &1)])).is_err());
/// ```
pub struct FnFactor<S, F> {
    function: F,
    marker: PhantomData<fn() -> S>,
}

impl<S, F> FnFactor<S, F>
where
    S: State,
    F: Fn(&Assignment<'_, S>) -> FactorResult<f64> + Send + Sync,
{
    #[inline]
    pub fn new(function: F) -> Self {
        FnFactor {
            function,
            marker: PhantomData,
        }
    }
}

impl<S, F> Debug for FnFactor<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactor").finish_non_exhaustive()
    }
}

impl<S, F> Factor for FnFactor<S, F>
where
    S: State,
    F: Fn(&Assignment<'_, S>) -> FactorResult<f64> + Send + Sync,
{
    type State = S;

    #[inline(always)]
    fn evaluate(&self, assignment: &Assignment<'_, S>) -> FactorResult<f64> {
        (self.function)(assignment)
    }
}
