use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::variable::State;

// ------------------------------------------------------------------------------------------

/// Errors that could appear in message algebra
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum MessageError {
    /// The divisor has zero weight at a state from the dividend's support
    #[error("Division by a zero weight at state {state}")]
    DivisionByZero {
        /// Debug representation of the offending state
        state: String,
    },

    /// Normalization of a message whose total weight is zero
    #[error("Message has zero total weight and can not be normalized")]
    ZeroTotalWeight,

    /// Total weight of a message overflowed or is NaN
    #[error("Message has non-finite total weight {total} and can not be normalized")]
    NonFiniteTotal {
        /// The offending total
        total: f64,
    },

    /// An operation produced an infinite or NaN weight
    #[error("Weight at state {state} is not finite")]
    NonFiniteWeight {
        /// Debug representation of the offending state
        state: String,
    },

    /// A weight is negative or not finite
    #[error("Invalid weight {weight} at state {state}, weights must be finite and non-negative")]
    InvalidWeight {
        /// Debug representation of the offending state
        state: String,

        /// The rejected weight
        weight: f64,
    },
}

/// Message algebra result type
pub type MessageResult<T> = Result<T, MessageError>;

// ------------------------------------------------------------------------------------------

/// A sparse unnormalized non-negative function over a discrete domain.
///
/// Only states with a strictly positive weight are stored, every other state
/// has weight 0. All algebraic operations return new messages, the only
/// in-place operation is [`Message::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message<S: State> {
    weights: BTreeMap<S, f64>,
}

impl<S: State> Default for Message<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Message<S> {
    /// Creates a message with empty support
    #[inline]
    pub fn new() -> Self {
        Message {
            weights: BTreeMap::new(),
        }
    }

    /// Creates a message from `(state, weight)` pairs
    ///
    /// # Notes
    ///
    /// Zero weights are dropped, a repeated state keeps its last weight.
    /// Negative or non-finite weights are rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::Message;
    ///
    /// let m = Message::from_weights([('a', 1.), ('b', 0.), ('c', 3.)]).unwrap();
    /// assert_eq!(m.get(&'c'), 3.);
    /// assert_eq!(m.get(&'z'), 0.);
    /// assert_eq!(m.support().collect::<Vec<_>>(), vec![&'a', &'c']);
    /// assert!(Message::from_weights([('a', -1.)]).is_err());
    /// ```
    pub fn from_weights(weights: impl IntoIterator<Item = (S, f64)>) -> MessageResult<Self> {
        let mut message = Message::new();
        for (state, weight) in weights {
            if !weight.is_finite() || weight < 0f64 {
                return Err(MessageError::InvalidWeight {
                    state: format!("{:?}", state),
                    weight,
                });
            }
            if weight > 0f64 {
                message.weights.insert(state, weight);
            } else {
                message.weights.remove(&state);
            }
        }
        Ok(message)
    }

    /// Creates a message assigning the same weight to every state of a domain
    #[inline]
    pub fn uniform(domain: impl IntoIterator<Item = S>, weight: f64) -> Self {
        debug_assert!(weight >= 0f64);
        let weights = if weight > 0f64 {
            domain.into_iter().map(|s| (s, weight)).collect()
        } else {
            BTreeMap::new()
        };
        Message { weights }
    }

    /// Creates a message with unit weight at one state
    #[inline]
    pub fn indicator(state: S) -> Self {
        Message {
            weights: BTreeMap::from([(state, 1f64)]),
        }
    }

    /// States with strictly positive weight, in ascending order
    #[inline]
    pub fn support(&self) -> impl Iterator<Item = &S> + '_ {
        self.weights.keys()
    }

    /// Iterates over `(state, weight)` pairs of the support
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> + '_ {
        self.weights.iter().map(|(s, w)| (s, *w))
    }

    /// Size of the support
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Returns the weight of a state, 0 if the state is outside of the support
    #[inline]
    pub fn get(&self, state: &S) -> f64 {
        self.weights.get(state).copied().unwrap_or(0f64)
    }

    /// Sum of all weights
    #[inline]
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Divides every weight by the total weight and returns the total weight
    ///
    /// # Notes
    ///
    /// A message with zero or non-finite total weight is left untouched and
    /// an error is returned
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::Message;
    ///
    /// let mut m = Message::from_weights([(0u8, 1.), (1, 3.)]).unwrap();
    /// assert_eq!(m.normalize().unwrap(), 4.);
    /// assert_eq!(m.get(&1), 0.75);
    /// assert!(Message::<u8>::new().normalize().is_err());
    /// ```
    pub fn normalize(&mut self) -> MessageResult<f64> {
        let z = self.total();
        if !z.is_finite() {
            return Err(MessageError::NonFiniteTotal { total: z });
        }
        if z <= 0f64 {
            return Err(MessageError::ZeroTotalWeight);
        }
        self.weights.values_mut().for_each(|w| *w /= z);
        Ok(z)
    }

    /// Returns a normalized copy of a message
    #[inline]
    pub fn normalized(&self) -> MessageResult<Self> {
        let mut message = self.clone();
        message.normalize()?;
        Ok(message)
    }

    /// Elementwise product over the union of supports
    ///
    /// # Notes
    ///
    /// A state missing from either operand contributes weight 0, so only
    /// the common part of the supports survives
    pub fn multiply(&self, other: &Self) -> Self {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let weights = small
            .weights
            .iter()
            .filter_map(|(s, w)| {
                let product = w * large.get(s);
                (product > 0f64).then(|| (s.clone(), product))
            })
            .collect();
        Message { weights }
    }

    /// Elementwise quotient over the union of supports
    ///
    /// # Notes
    ///
    /// States outside of the dividend's support get weight 0. If the divisor
    /// has zero weight at a state from the dividend's support, or a quotient
    /// is not finite, an error is returned
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::Message;
    ///
    /// let a = Message::from_weights([('x', 2.), ('y', 6.)]).unwrap();
    /// let b = Message::from_weights([('x', 4.), ('y', 3.), ('z', 1.)]).unwrap();
    /// let q = a.divide(&b).unwrap();
    /// assert_eq!(q.get(&'x'), 0.5);
    /// assert_eq!(q.get(&'y'), 2.);
    /// assert_eq!(q.get(&'z'), 0.);
    /// assert!(b.divide(&a).is_err());
    /// ```
    pub fn divide(&self, other: &Self) -> MessageResult<Self> {
        let mut weights = BTreeMap::new();
        for (s, w) in &self.weights {
            let d = other.get(s);
            if d == 0f64 {
                return Err(MessageError::DivisionByZero {
                    state: format!("{:?}", s),
                });
            }
            let quotient = w / d;
            if !quotient.is_finite() {
                return Err(MessageError::NonFiniteWeight {
                    state: format!("{:?}", s),
                });
            }
            if quotient > 0f64 {
                weights.insert(s.clone(), quotient);
            }
        }
        Ok(Message { weights })
    }

    /// Elementwise sum over the union of supports
    pub fn add(&self, other: &Self) -> Self {
        let mut weights = self.weights.clone();
        for (s, w) in &other.weights {
            *weights.entry(s.clone()).or_insert(0f64) += w;
        }
        Message { weights }
    }

    /// Multiplies every weight of the support by a non-negative scalar
    pub fn scale(&self, c: f64) -> Self {
        debug_assert!(c >= 0f64);
        let weights = self
            .weights
            .iter()
            .filter_map(|(s, w)| {
                let scaled = w * c;
                (scaled > 0f64).then(|| (s.clone(), scaled))
            })
            .collect();
        Message { weights }
    }

    /// Folds a collection of messages with [`Message::multiply`]
    ///
    /// Returns `None` for an empty collection
    pub fn product<'a>(messages: impl IntoIterator<Item = &'a Self>) -> Option<Self> {
        let mut iter = messages.into_iter();
        let first = iter.next()?.clone();
        Some(iter.fold(first, |acc, m| acc.multiply(m)))
    }

    /// L1 distance between messages, a state absent from a message counts as weight 0
    ///
    /// # Notes
    ///
    /// This is the drift measure used by the belief propagation stopping criterion
    pub fn discrepancy(&self, other: &Self) -> f64 {
        let own: f64 = self
            .weights
            .iter()
            .map(|(s, w)| (w - other.get(s)).abs())
            .sum();
        let foreign: f64 = other
            .weights
            .iter()
            .filter(|(s, _)| !self.weights.contains_key(*s))
            .map(|(_, w)| *w)
            .sum();
        own + foreign
    }

    /// Dense view of a message in the order of a given domain
    pub fn to_dense(&self, domain: &[S]) -> Array1<f64> {
        domain.iter().map(|s| self.get(s)).collect()
    }
}
