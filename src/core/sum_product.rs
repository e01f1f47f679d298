use log::{debug, info};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::core::{
    config::BPConfig,
    factor::FactorId,
    factor_graph::{
        BPInfo, FGError, FGResult, FactorGraph, InferenceState, SweepEvent, Termination,
    },
    message::Message,
    variable::{State, VariableId},
};

impl<S: State> FactorGraph<S> {
    /// Seeds every edge message incident to a variable with domain size `n`
    /// and degree `d` by the uniform message `(1/n)^(1/d)`
    ///
    /// # Notes
    ///
    /// Calling it again resets all messages to their initial values
    pub fn initialize_messages(&mut self) {
        for node in &self.variables {
            if let Some(seed) = node.seed() {
                for e in &node.edges {
                    let edge = &mut self.edges[*e];
                    edge.v_2_f = seed.clone();
                    edge.f_2_v = seed.clone();
                }
            }
        }
        self.state = InferenceState::Initialized;
    }

    /// Updates messages sent by a variable to all its adjoint factors
    pub fn message_from_var_to_factor(&mut self, variable: VariableId) -> FGResult<()> {
        self.ensure_initialized()?;
        let node = self
            .variables
            .get(variable.0)
            .ok_or(FGError::OutOfRangeVariable(self.variables.len(), variable.0))?;
        let messages = node.eval_messages(&self.edges)?;
        for (e, message) in node.edges.iter().zip(messages) {
            self.edges[*e].v_2_f = message;
        }
        Ok(())
    }

    /// Updates messages sent by a factor to all its adjoint variables
    pub fn message_from_factor_to_var(&mut self, factor: FactorId) -> FGResult<()> {
        self.ensure_initialized()?;
        let node = self
            .factors
            .get(factor.0)
            .ok_or(FGError::OutOfRangeFactor(self.factors.len(), factor.0))?;
        let messages = node.eval_messages(&self.edges, &self.variables)?;
        for (e, message) in node.edges.iter().zip(messages) {
            self.edges[*e].f_2_v = message;
        }
        Ok(())
    }

    /// Rescales messages received by a variable by `(1/Z)^(1/d)`, where `Z`
    /// is the total weight of their product, making the product normalized
    pub fn normalize_messages(&mut self, variable: VariableId) -> FGResult<()> {
        self.ensure_initialized()?;
        let node = self
            .variables
            .get(variable.0)
            .ok_or(FGError::OutOfRangeVariable(self.variables.len(), variable.0))?;
        if let Some(coefficient) = node.eval_normalization(&self.edges)? {
            for e in &node.edges {
                let edge = &mut self.edges[*e];
                edge.f_2_v = edge.f_2_v.scale(coefficient);
            }
        }
        Ok(())
    }

    /// Runs synchronous sum-product sweeps until the total drift of messages
    /// is not greater than `max_error` or `max_iter` sweeps are done
    ///
    /// # Arguments
    ///
    /// * `max_iter` - A maximal number of sweeps, exhausting it is not an error
    /// * `max_error` - A threshold on the L1 drift of all messages during a sweep
    ///
    /// # Notes
    ///
    /// Variable to factor messages are not normalized here. On a graph with
    /// cycles their scale grows every sweep, so the drift stays large and after
    /// a few hundred sweeps weights overflow, which is reported as
    /// [`FGError::Overflow`]. Use [`FactorGraph::run`] with
    /// [`BPConfig::normalize_outgoing`] for such graphs.
    ///
    /// If a sweep fails, edge messages are restored to their values before
    /// that sweep and the inference state is left unchanged
    ///
    /// # Example
    ///
    /// ```
    /// use sumprod::core::{FactorGraphBuilder, Termination};
    /// use ndarray::array;
    ///
    /// let mut fgb = FactorGraphBuilder::new();
    /// let x = fgb.add_variable("x", [0u8, 1]).unwrap();
    /// let y = fgb.add_variable("y", [0u8, 1]).unwrap();
    /// fgb.add_table_factor("f", &[x, y], array![[1., 2.], [3., 4.]].into_dyn())
    ///     .unwrap();
    /// let mut fg = fgb.build();
    /// fg.initialize_messages();
    /// let info = fg.belief_propagation(5, 1e-9).unwrap();
    /// assert_eq!(info.status, Termination::Converged);
    ///
    /// // p(x) = (3, 7) / 10
    /// let belief = fg.calc_belief().unwrap()[&x].normalized().unwrap();
    /// assert!((belief.get(&0) - 0.3).abs() < 1e-12);
    /// assert!((belief.get(&1) - 0.7).abs() < 1e-12);
    /// ```
    #[inline]
    pub fn belief_propagation(&mut self, max_iter: usize, max_error: f64) -> FGResult<BPInfo> {
        self.run(&BPConfig::new(max_iter, max_error))
    }

    /// Runs message passing with the given hyper-parameters
    #[inline]
    pub fn run(&mut self, config: &BPConfig) -> FGResult<BPInfo> {
        self.belief_propagation_with_observer(config, |_| {})
    }

    /// Runs message passing calling `observer` after every sweep
    ///
    /// # Arguments
    ///
    /// * `config` - Hyper-parameters of message passing
    /// * `observer` - A callback receiving the sweep index and the sweep's drift
    pub fn belief_propagation_with_observer(
        &mut self,
        config: &BPConfig,
        mut observer: impl FnMut(&SweepEvent),
    ) -> FGResult<BPInfo> {
        config.validate()?;
        self.ensure_initialized()?;
        let mut error_dynamics = Vec::with_capacity(config.max_iter);
        for sweep in 0..config.max_iter {
            let error = self.sweep(config)?;
            error_dynamics.push(error);
            debug!("sweep {}: drift {:e}", sweep, error);
            observer(&SweepEvent { sweep, error });
            if error <= config.max_error && sweep + 1 >= config.min_iter {
                self.state = InferenceState::Converged;
                let info = BPInfo {
                    status: Termination::Converged,
                    sweeps: sweep + 1,
                    last_error: Some(error),
                    error_dynamics,
                };
                info!("{}", info);
                return Ok(info);
            }
        }
        self.state = InferenceState::Exhausted;
        let info = BPInfo {
            status: Termination::Exhausted,
            sweeps: config.max_iter,
            last_error: error_dynamics.last().copied(),
            error_dynamics,
        };
        info!("{}", info);
        Ok(info)
    }

    /// One synchronous sweep, returns the total drift of messages.
    /// On failure edge messages are rolled back to the snapshot
    fn sweep(&mut self, config: &BPConfig) -> FGResult<f64> {
        let snapshot: Vec<(Message<S>, Message<S>)> = self
            .edges
            .iter()
            .map(|edge| (edge.v_2_f.clone(), edge.f_2_v.clone()))
            .collect();
        if let Err(error) = self.update_messages(config) {
            for (edge, (v_2_f, f_2_v)) in self.edges.iter_mut().zip(snapshot) {
                edge.v_2_f = v_2_f;
                edge.f_2_v = f_2_v;
            }
            return Err(error);
        }
        Ok(self
            .edges
            .iter()
            .zip(&snapshot)
            .map(|(edge, (v_2_f, f_2_v))| {
                edge.v_2_f.discrepancy(v_2_f) + edge.f_2_v.discrepancy(f_2_v)
            })
            .sum())
    }

    /// Factor, variable and normalization phases of a sweep
    fn update_messages(&mut self, config: &BPConfig) -> FGResult<()> {
        let damping = config.damping;

        // factors read only v_2_f messages of the previous sweep
        let factor_messages = self
            .factors
            .par_iter()
            .map(|factor| factor.eval_messages(&self.edges, &self.variables))
            .collect::<FGResult<Vec<_>>>()?;
        for (factor, messages) in self.factors.iter().zip(factor_messages) {
            for (e, message) in factor.edges.iter().zip(messages) {
                let edge = &mut self.edges[*e];
                edge.f_2_v = if damping > 0f64 {
                    message.scale(1f64 - damping).add(&edge.f_2_v.scale(damping))
                } else {
                    message
                };
            }
        }

        let variable_messages = self
            .variables
            .par_iter()
            .map(|variable| -> FGResult<Vec<Message<S>>> {
                let mut messages = variable.eval_messages(&self.edges)?;
                if config.normalize_outgoing {
                    for message in &mut messages {
                        message
                            .normalize()
                            .map_err(|error| variable.attribute_error(error))?;
                    }
                }
                Ok(messages)
            })
            .collect::<FGResult<Vec<_>>>()?;
        for (variable, messages) in self.variables.iter().zip(variable_messages) {
            for (e, message) in variable.edges.iter().zip(messages) {
                self.edges[*e].v_2_f = message;
            }
        }

        let coefficients = self
            .variables
            .par_iter()
            .map(|variable| variable.eval_normalization(&self.edges))
            .collect::<FGResult<Vec<_>>>()?;
        for (variable, coefficient) in self.variables.iter().zip(coefficients) {
            if let Some(coefficient) = coefficient {
                for e in &variable.edges {
                    let edge = &mut self.edges[*e];
                    edge.f_2_v = edge.f_2_v.scale(coefficient);
                }
            }
        }
        Ok(())
    }
}
