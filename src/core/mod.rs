mod config;
mod factor;
mod factor_graph;
mod factor_graph_builder;
mod factor_node;
mod message;
mod sum_product;
mod variable;
mod variable_node;

pub use config::BPConfig;
pub use factor::{Assignment, Factor, FactorError, FactorId, FactorResult};
pub use factor_graph::{
    BPInfo, FGError, FGResult, FactorGraph, InferenceState, SweepEvent, Termination,
};
pub use factor_graph_builder::{FGBuilderError, FGBuilderResult, FactorGraphBuilder};
pub use message::{Message, MessageError, MessageResult};
pub use variable::{State, Variable, VariableId};
