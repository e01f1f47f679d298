use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// A bound on values a variable could take
///
/// # Notes
///
/// States are ordered in order to keep message storage and every
/// summation over it deterministic
pub trait State: Clone + Ord + Debug + Send + Sync + 'static {}

impl<T> State for T where T: Clone + Ord + Debug + Send + Sync + 'static {}

/// ID (index) of a variable in a factor graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariableId(pub usize);

impl Display for VariableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A discrete variable: a name and a finite domain of states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable<S: State> {
    pub(crate) name: String,
    pub(crate) domain: Vec<S>,
}

impl<S: State> Variable<S> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// States of a variable in the order they were registered
    #[inline]
    pub fn domain(&self) -> &[S] {
        &self.domain
    }

    #[inline]
    pub fn domain_size(&self) -> usize {
        self.domain.len()
    }
}
